//! # Identity Registry
//!
//! Links investor wallets to their identity and country, and decides
//! whether a wallet is verified.
//!
//! ## Verification
//!
//! A wallet is verified when its identity holds, for every required claim
//! topic, at least one valid claim from an issuer trusted for that topic.
//! An empty topic list verifies every registered wallet. Any failure while
//! validating a claim (unknown scheme, malformed signature, missing issuer)
//! counts as "not satisfied". The result is recomputed on every call.
//!
//! ## Security Invariant
//!
//! `is_verified` holds read guards on both registries and the subject
//! identity for the whole evaluation. Every guard is taken with
//! `read_recursive`, so a subject that is also its own issuer, or a caller
//! already holding a read guard, cannot deadlock behind a queued writer.
//!
//! One identity is linked to at most one wallet; only agents change links.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use serde_json::json;
use trex_core::{
    AccessControl, Address, ClaimId, CountryCode, InvestorCountry, Receipt, ReceiptBook, Role,
    TrexError,
};
use trex_identity::IdentityDirectory;

use crate::claim_topics::ClaimTopicsRegistry;
use crate::trusted_issuers::TrustedIssuersRegistry;

/// Shared handle to a claim topics registry.
pub type SharedClaimTopics = Arc<RwLock<ClaimTopicsRegistry>>;

/// Shared handle to a trusted issuers registry.
pub type SharedTrustedIssuers = Arc<RwLock<TrustedIssuersRegistry>>;

/// One registered wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Investor wallet.
    pub wallet: Address,
    /// Linked identity address.
    pub identity: Address,
    /// ISO-3166 numeric country code.
    pub country: CountryCode,
}

/// Wallet → identity registry.
pub struct IdentityRegistry {
    access: AccessControl,
    entries: BTreeMap<Address, RegistryEntry>,
    linked: HashMap<Address, Address>,
    topics: SharedClaimTopics,
    issuers: SharedTrustedIssuers,
    directory: Arc<IdentityDirectory>,
    receipts: ReceiptBook,
}

impl std::fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("address", &self.address())
            .field("owner", &self.access.owner())
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl IdentityRegistry {
    /// An empty registry at `address`, owned by `owner`, reading required
    /// topics and trusted issuers from the given registries and identities
    /// from `directory`.
    pub fn new(
        address: Address,
        owner: Address,
        topics: SharedClaimTopics,
        issuers: SharedTrustedIssuers,
        directory: Arc<IdentityDirectory>,
    ) -> Self {
        Self {
            access: AccessControl::new(owner),
            entries: BTreeMap::new(),
            linked: HashMap::new(),
            topics,
            issuers,
            directory,
            receipts: ReceiptBook::new(address),
        }
    }

    pub fn address(&self) -> Address {
        self.receipts.contract()
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    // ── Registration ───────────────────────────────────────────────────

    fn check_new_link(&self, wallet: &Address, identity: &Address) -> Result<(), TrexError> {
        if wallet.is_zero() || identity.is_zero() {
            return Err(TrexError::InvalidInput(
                "wallet and identity must be non-zero".into(),
            ));
        }
        if self.entries.contains_key(wallet) {
            return Err(TrexError::AlreadyRegistered {
                wallet: wallet.to_string(),
            });
        }
        self.check_identity_free(identity, None)
    }

    /// The identity must be deployed and not linked to a wallet other than
    /// `except`.
    fn check_identity_free(
        &self,
        identity: &Address,
        except: Option<&Address>,
    ) -> Result<(), TrexError> {
        if let Some(owner) = self.linked.get(identity) {
            if Some(owner) != except {
                return Err(TrexError::already_exists(format!(
                    "identity {identity} linked to wallet {owner}"
                )));
            }
        }
        if !self.directory.contains(identity) {
            return Err(TrexError::not_found(format!("identity {identity}")));
        }
        Ok(())
    }

    fn link(&mut self, entry: RegistryEntry) {
        self.linked.insert(entry.identity, entry.wallet);
        self.entries.insert(entry.wallet, entry);
    }

    /// Link `wallet` to `identity` with `country`. Agent-gated.
    pub fn register_identity(
        &mut self,
        caller: &Address,
        wallet: Address,
        identity: Address,
        country: CountryCode,
    ) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        self.check_new_link(&wallet, &identity)?;
        let entry = RegistryEntry {
            wallet,
            identity,
            country,
        };
        let receipt = self.receipts.issue("register_identity", &entry)?;
        self.link(entry);
        tracing::info!(
            registry = %self.address(),
            wallet = %wallet,
            identity = %identity,
            country = %country,
            "identity registered"
        );
        Ok(receipt)
    }

    /// Register several wallets at once. Either every entry is registered
    /// or none is.
    pub fn batch_register_identity(
        &mut self,
        caller: &Address,
        entries: &[RegistryEntry],
    ) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        if entries.is_empty() {
            return Err(TrexError::InvalidInput("empty registration batch".into()));
        }
        let mut wallets = BTreeSet::new();
        let mut identities = BTreeSet::new();
        for entry in entries {
            self.check_new_link(&entry.wallet, &entry.identity)?;
            if !wallets.insert(entry.wallet) {
                return Err(TrexError::AlreadyRegistered {
                    wallet: entry.wallet.to_string(),
                });
            }
            if !identities.insert(entry.identity) {
                return Err(TrexError::already_exists(format!(
                    "identity {} listed twice in batch",
                    entry.identity
                )));
            }
        }
        let receipt = self
            .receipts
            .issue("batch_register_identity", &json!({ "entries": entries }))?;
        for entry in entries {
            self.link(*entry);
        }
        tracing::info!(registry = %self.address(), count = entries.len(), "identities registered in batch");
        Ok(receipt)
    }

    /// Relink `wallet` to another identity. Agent-gated.
    pub fn update_identity(
        &mut self,
        caller: &Address,
        wallet: &Address,
        identity: Address,
    ) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        let current = self.require_entry(wallet)?;
        if identity.is_zero() {
            return Err(TrexError::InvalidInput("identity must be non-zero".into()));
        }
        self.check_identity_free(&identity, Some(wallet))?;
        let receipt = self.receipts.issue(
            "update_identity",
            &json!({ "wallet": wallet, "identity": identity }),
        )?;
        self.linked.remove(&current.identity);
        self.link(RegistryEntry {
            identity,
            ..current
        });
        tracing::info!(
            registry = %self.address(),
            wallet = %wallet,
            old_identity = %current.identity,
            identity = %identity,
            "identity updated"
        );
        Ok(receipt)
    }

    /// Change the country of `wallet`. Agent-gated.
    pub fn update_country(
        &mut self,
        caller: &Address,
        wallet: &Address,
        country: CountryCode,
    ) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        let current = self.require_entry(wallet)?;
        let receipt = self.receipts.issue(
            "update_country",
            &json!({ "wallet": wallet, "country": country }),
        )?;
        self.entries.insert(
            *wallet,
            RegistryEntry {
                country,
                ..current
            },
        );
        tracing::info!(registry = %self.address(), wallet = %wallet, country = %country, "country updated");
        Ok(receipt)
    }

    /// Unlink `wallet`. Agent-gated.
    pub fn delete_identity(
        &mut self,
        caller: &Address,
        wallet: &Address,
    ) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        let current = self.require_entry(wallet)?;
        let receipt = self
            .receipts
            .issue("delete_identity", &json!({ "wallet": wallet }))?;
        self.entries.remove(wallet);
        self.linked.remove(&current.identity);
        tracing::info!(registry = %self.address(), wallet = %wallet, identity = %current.identity, "identity deleted");
        Ok(receipt)
    }

    fn require_entry(&self, wallet: &Address) -> Result<RegistryEntry, TrexError> {
        self.entries
            .get(wallet)
            .copied()
            .ok_or_else(|| TrexError::not_found(format!("wallet {wallet}")))
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// The identity linked to `wallet`.
    pub fn identity(&self, wallet: &Address) -> Option<Address> {
        self.entries.get(wallet).map(|e| e.identity)
    }

    /// The country of `wallet`.
    pub fn investor_country(&self, wallet: &Address) -> Option<CountryCode> {
        self.entries.get(wallet).map(|e| e.country)
    }

    /// Whether `wallet` is registered.
    pub fn contains(&self, wallet: &Address) -> bool {
        self.entries.contains_key(wallet)
    }

    pub fn entry(&self, wallet: &Address) -> Option<&RegistryEntry> {
        self.entries.get(wallet)
    }

    /// Registered entries in wallet order.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `wallet` currently satisfies every required claim topic.
    pub fn is_verified(&self, wallet: &Address) -> bool {
        let Some(entry) = self.entries.get(wallet) else {
            tracing::debug!(wallet = %wallet, "not verified: wallet not registered");
            return false;
        };
        let topics = self.topics.read_recursive();
        let issuers = self.issuers.read_recursive();
        let required = topics.get_claim_topics();
        if required.is_empty() {
            return true;
        }
        let Some(handle) = self.directory.get(&entry.identity) else {
            tracing::debug!(wallet = %wallet, identity = %entry.identity, "not verified: identity not deployed");
            return false;
        };
        let subject = handle.read_recursive();

        for &topic in required {
            let trusted = issuers.get_trusted_issuers_for_claim_topic(topic);
            if trusted.is_empty() {
                tracing::debug!(wallet = %wallet, topic = topic.value(), "not verified: no trusted issuer for topic");
                return false;
            }
            let satisfied = trusted.iter().any(|issuer| {
                let Some(claim) = subject.get_claim(&ClaimId::derive(issuer, topic)) else {
                    return false;
                };
                match subject.verify_claim(self.directory.as_ref(), claim) {
                    Ok(valid) => {
                        tracing::debug!(wallet = %wallet, topic = topic.value(), issuer = %issuer, valid, "claim checked");
                        valid
                    }
                    Err(e) => {
                        tracing::debug!(wallet = %wallet, topic = topic.value(), issuer = %issuer, error = %e, "claim rejected");
                        false
                    }
                }
            });
            if !satisfied {
                tracing::debug!(wallet = %wallet, topic = topic.value(), "not verified: topic unsatisfied");
                return false;
            }
        }
        true
    }

    // ── Roles and wiring ───────────────────────────────────────────────

    pub fn is_agent(&self, who: &Address) -> bool {
        self.access.is_agent(who)
    }

    /// Agents in address order.
    pub fn agents(&self) -> Vec<Address> {
        self.access.agents().copied().collect()
    }

    /// Grant the agent role. Owner-gated.
    pub fn add_agent(&mut self, caller: &Address, agent: Address) -> Result<Receipt, TrexError> {
        self.access.check_add_agent(caller, &agent)?;
        let receipt = self.receipts.issue("add_agent", &json!({ "agent": agent }))?;
        self.access.add_agent(caller, agent)?;
        tracing::info!(registry = %self.address(), agent = %agent, "agent added");
        Ok(receipt)
    }

    /// Revoke the agent role. Owner-gated.
    pub fn remove_agent(&mut self, caller: &Address, agent: &Address) -> Result<Receipt, TrexError> {
        self.access.check_remove_agent(caller, agent)?;
        let receipt = self
            .receipts
            .issue("remove_agent", &json!({ "agent": agent }))?;
        self.access.remove_agent(caller, agent)?;
        tracing::info!(registry = %self.address(), agent = %agent, "agent removed");
        Ok(receipt)
    }

    /// Hand the registry to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Receipt, TrexError> {
        self.access.check_transfer_ownership(caller, &new_owner)?;
        let receipt = self
            .receipts
            .issue("transfer_ownership", &json!({ "new_owner": new_owner }))?;
        self.access.transfer_ownership(caller, new_owner)?;
        tracing::info!(registry = %self.address(), owner = %new_owner, "ownership transferred");
        Ok(receipt)
    }

    /// Read required topics from another registry. Owner-gated.
    pub fn set_claim_topics_registry(
        &mut self,
        caller: &Address,
        topics: SharedClaimTopics,
    ) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        let address = topics.read().address();
        let receipt = self
            .receipts
            .issue("set_claim_topics_registry", &json!({ "registry": address }))?;
        self.topics = topics;
        tracing::info!(registry = %self.address(), topics = %address, "claim topics registry set");
        Ok(receipt)
    }

    /// Read trusted issuers from another registry. Owner-gated.
    pub fn set_trusted_issuers_registry(
        &mut self,
        caller: &Address,
        issuers: SharedTrustedIssuers,
    ) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        let address = issuers.read().address();
        let receipt = self
            .receipts
            .issue("set_trusted_issuers_registry", &json!({ "registry": address }))?;
        self.issuers = issuers;
        tracing::info!(registry = %self.address(), issuers = %address, "trusted issuers registry set");
        Ok(receipt)
    }

    pub fn claim_topics_registry(&self) -> SharedClaimTopics {
        Arc::clone(&self.topics)
    }

    pub fn trusted_issuers_registry(&self) -> SharedTrustedIssuers {
        Arc::clone(&self.issuers)
    }

    pub fn directory(&self) -> Arc<IdentityDirectory> {
        Arc::clone(&self.directory)
    }
}

// ── Shared handle ──────────────────────────────────────────────────────

/// An identity registry behind one lock, shared between tokens and
/// compliance modules.
#[derive(Debug, Clone)]
pub struct SharedIdentityRegistry(Arc<RwLock<IdentityRegistry>>);

impl SharedIdentityRegistry {
    pub fn new(registry: IdentityRegistry) -> Self {
        Self(Arc::new(RwLock::new(registry)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, IdentityRegistry> {
        self.0.read_recursive()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, IdentityRegistry> {
        self.0.write()
    }

    /// Shorthand for `read().is_verified(wallet)`.
    pub fn is_verified(&self, wallet: &Address) -> bool {
        self.read().is_verified(wallet)
    }
}

impl InvestorCountry for SharedIdentityRegistry {
    fn investor_country(&self, wallet: &Address) -> Option<CountryCode> {
        self.read().investor_country(wallet)
    }
}
