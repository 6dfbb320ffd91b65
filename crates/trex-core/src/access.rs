//! # Role Records — Owner and Agents
//!
//! Every registry, the compliance engine, and the token carry an explicit
//! `AccessControl` value. There is no ambient or global authority.
//!
//! ## Security Invariant
//!
//! Owner and agent are separate roles. The owner configures (topics,
//! issuers, modules, agent set); agents operate (register identities,
//! mint, freeze). The owner is not implicitly an agent; it must add itself
//! to act as one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::TrexError;
use crate::identity::Address;

/// A role a caller can hold on a guarded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Configures the object and manages its agents.
    Owner,
    /// Performs day-to-day operations.
    Agent,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Agent => "agent",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner plus agent set of one guarded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Address,
    agents: BTreeSet<Address>,
}

impl AccessControl {
    /// A record owned by `owner`, with no agents.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            agents: BTreeSet::new(),
        }
    }

    /// The current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Whether `caller` holds `role`.
    pub fn has_role(&self, caller: &Address, role: Role) -> bool {
        match role {
            Role::Owner => *caller == self.owner,
            Role::Agent => self.agents.contains(caller),
        }
    }

    /// Whether `caller` is an agent.
    pub fn is_agent(&self, caller: &Address) -> bool {
        self.has_role(caller, Role::Agent)
    }

    /// Fail `Unauthorized` unless `caller` holds `role`.
    pub fn require_role(&self, caller: &Address, role: Role) -> Result<(), TrexError> {
        if self.has_role(caller, role) {
            Ok(())
        } else {
            Err(TrexError::unauthorized(caller, role.as_str()))
        }
    }

    /// Shorthand for `require_role(caller, Role::Owner)`.
    pub fn require_owner(&self, caller: &Address) -> Result<(), TrexError> {
        self.require_role(caller, Role::Owner)
    }

    /// Shorthand for `require_role(caller, Role::Agent)`.
    pub fn require_agent(&self, caller: &Address) -> Result<(), TrexError> {
        self.require_role(caller, Role::Agent)
    }

    /// Agents in address order.
    pub fn agents(&self) -> impl Iterator<Item = &Address> {
        self.agents.iter()
    }

    /// Validate an agent addition without applying it.
    pub fn check_add_agent(&self, caller: &Address, agent: &Address) -> Result<(), TrexError> {
        self.require_owner(caller)?;
        if agent.is_zero() {
            return Err(TrexError::InvalidInput("agent cannot be the zero address".into()));
        }
        if self.agents.contains(agent) {
            return Err(TrexError::already_exists(format!("agent {agent}")));
        }
        Ok(())
    }

    /// Validate an agent removal without applying it.
    pub fn check_remove_agent(&self, caller: &Address, agent: &Address) -> Result<(), TrexError> {
        self.require_owner(caller)?;
        if !self.agents.contains(agent) {
            return Err(TrexError::not_found(format!("agent {agent}")));
        }
        Ok(())
    }

    /// Validate an ownership transfer without applying it.
    pub fn check_transfer_ownership(
        &self,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<(), TrexError> {
        self.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(TrexError::InvalidInput("owner cannot be the zero address".into()));
        }
        Ok(())
    }

    /// Add an agent. Owner-gated.
    pub fn add_agent(&mut self, caller: &Address, agent: Address) -> Result<(), TrexError> {
        self.check_add_agent(caller, &agent)?;
        self.agents.insert(agent);
        Ok(())
    }

    /// Remove an agent. Owner-gated.
    pub fn remove_agent(&mut self, caller: &Address, agent: &Address) -> Result<(), TrexError> {
        self.check_remove_agent(caller, agent)?;
        self.agents.remove(agent);
        Ok(())
    }

    /// Hand ownership to `new_owner`. Owner-gated.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<(), TrexError> {
        self.check_transfer_ownership(caller, &new_owner)?;
        self.owner = new_owner;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address([1; 20]);
    const AGENT: Address = Address([2; 20]);
    const STRANGER: Address = Address([3; 20]);

    #[test]
    fn owner_is_not_implicitly_agent() {
        let acl = AccessControl::new(OWNER);
        assert!(acl.require_owner(&OWNER).is_ok());
        assert!(matches!(
            acl.require_agent(&OWNER),
            Err(TrexError::Unauthorized { .. })
        ));
    }

    #[test]
    fn agent_lifecycle() {
        let mut acl = AccessControl::new(OWNER);
        acl.add_agent(&OWNER, AGENT).unwrap();
        assert!(acl.is_agent(&AGENT));
        assert!(matches!(
            acl.add_agent(&OWNER, AGENT),
            Err(TrexError::AlreadyExists { .. })
        ));
        acl.remove_agent(&OWNER, &AGENT).unwrap();
        assert!(!acl.is_agent(&AGENT));
        assert!(matches!(
            acl.remove_agent(&OWNER, &AGENT),
            Err(TrexError::NotFound { .. })
        ));
    }

    #[test]
    fn strangers_cannot_manage_agents() {
        let mut acl = AccessControl::new(OWNER);
        let err = acl.add_agent(&STRANGER, AGENT).unwrap_err();
        assert!(err.to_string().contains("owner"));
        assert_eq!(acl.agents().count(), 0);
    }

    #[test]
    fn ownership_transfer() {
        let mut acl = AccessControl::new(OWNER);
        assert!(acl.transfer_ownership(&OWNER, Address::ZERO).is_err());
        acl.transfer_ownership(&OWNER, STRANGER).unwrap();
        assert_eq!(acl.owner(), STRANGER);
        assert!(acl.require_owner(&OWNER).is_err());
    }
}
