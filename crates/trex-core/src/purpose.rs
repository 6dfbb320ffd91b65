//! # Key Purposes — Single Source of Truth
//!
//! Defines `KeyPurpose`, the three authority levels a key can hold inside
//! an identity, and `PurposeSet`, the set-valued attribute a key carries.
//! Every `match` on `KeyPurpose` is exhaustive.
//!
//! ## Security Invariant
//!
//! MANAGEMENT satisfies every purpose requirement. `PurposeSet::covers` is
//! the only place that rule is encoded, so key-store checks cannot drift
//! from execution-approval checks.
//!
//! | Code | Purpose | Grants |
//! |------|---------|--------|
//! | 1 | MANAGEMENT | key management, self-targeted executions |
//! | 2 | ACTION | external executions |
//! | 3 | CLAIM | claim management, claim signing (on issuers) |

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrexError;

/// Authority level of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyPurpose {
    /// Manage keys and approve self-targeted executions.
    Management,
    /// Approve executions targeting other contracts.
    Action,
    /// Manage claims; on an issuer, sign claims.
    Claim,
}

impl KeyPurpose {
    /// All purposes, in code order.
    pub const ALL: [KeyPurpose; 3] = [Self::Management, Self::Action, Self::Claim];

    /// Numeric purpose code.
    pub fn code(&self) -> u64 {
        match self {
            Self::Management => 1,
            Self::Action => 2,
            Self::Claim => 3,
        }
    }

    /// Decode a numeric purpose code.
    pub fn from_code(code: u64) -> Result<Self, TrexError> {
        match code {
            1 => Ok(Self::Management),
            2 => Ok(Self::Action),
            3 => Ok(Self::Claim),
            other => Err(TrexError::InvalidInput(format!("unknown key purpose {other}"))),
        }
    }

    /// Upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Management => "MANAGEMENT",
            Self::Action => "ACTION",
            Self::Claim => "CLAIM",
        }
    }
}

impl std::fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyPurpose {
    type Err = TrexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MANAGEMENT" => Ok(Self::Management),
            "ACTION" => Ok(Self::Action),
            "CLAIM" => Ok(Self::Claim),
            _ => Err(TrexError::InvalidInput(format!("unknown key purpose {s:?}"))),
        }
    }
}

/// The purposes held by one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurposeSet(BTreeSet<KeyPurpose>);

impl PurposeSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the exact purpose is held.
    pub fn contains(&self, purpose: KeyPurpose) -> bool {
        self.0.contains(&purpose)
    }

    /// Whether the set satisfies `required`. MANAGEMENT satisfies anything.
    pub fn covers(&self, required: KeyPurpose) -> bool {
        self.contains(KeyPurpose::Management) || self.contains(required)
    }

    /// Insert a purpose; returns false if it was already held.
    pub fn insert(&mut self, purpose: KeyPurpose) -> bool {
        self.0.insert(purpose)
    }

    /// Remove a purpose; returns false if it was not held.
    pub fn remove(&mut self, purpose: KeyPurpose) -> bool {
        self.0.remove(&purpose)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Purposes in code order.
    pub fn iter(&self) -> impl Iterator<Item = KeyPurpose> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<KeyPurpose> for PurposeSet {
    fn from_iter<I: IntoIterator<Item = KeyPurpose>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for PurposeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|p| p.as_str()).collect();
        write!(f, "{{{}}}", names.join(","))
    }
}

/// Algorithm tag of a stored key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    /// secp256k1 ECDSA.
    Ecdsa,
    /// RSA.
    Rsa,
    /// Ed25519.
    Ed25519,
}

impl KeyType {
    /// Numeric key type code.
    pub fn code(&self) -> u64 {
        match self {
            Self::Ecdsa => 1,
            Self::Rsa => 2,
            Self::Ed25519 => 3,
        }
    }
}
