//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types shared by every layer of the core. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Authorization failures name the caller and the missing purpose or role.
//! - Every failed mutation leaves state untouched; the error is the only
//!   observable effect.
//! - Cryptographic failures (`InvalidSignature`, `UnsupportedScheme`) are
//!   distinct from a claim that is merely not valid, which is `Ok(false)`.

use thiserror::Error;

/// Top-level error type for the T-REX core.
#[derive(Error, Debug)]
pub enum TrexError {
    /// Caller lacks the key purpose or registry role the operation requires.
    #[error("unauthorized: {caller} lacks {required}")]
    Unauthorized {
        /// The calling address or key.
        caller: String,
        /// The purpose or role that was required.
        required: String,
    },

    /// The referenced key, claim, entry, or execution does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing item.
        what: String,
    },

    /// The item is already present.
    #[error("already exists: {what}")]
    AlreadyExists {
        /// Description of the duplicate item.
        what: String,
    },

    /// The wallet already has an identity in the registry.
    #[error("wallet {wallet} already has a registered identity")]
    AlreadyRegistered {
        /// The wallet address.
        wallet: String,
    },

    /// The module or token is already bound.
    #[error("already bound: {what}")]
    AlreadyBound {
        /// Description of the binding.
        what: String,
    },

    /// The module or token is not bound.
    #[error("not bound: {what}")]
    NotBound {
        /// Description of the missing binding.
        what: String,
    },

    /// Removing the key would leave the identity without a MANAGEMENT key.
    #[error("cannot remove {key}: it is the last management key")]
    LastManagementKey {
        /// The key that could not be removed.
        key: String,
    },

    /// The execution has already been dispatched.
    #[error("execution {id} was already executed")]
    AlreadyExecuted {
        /// The execution identifier.
        id: u64,
    },

    /// The execution was rejected and is closed.
    #[error("execution {id} was rejected")]
    ExecutionRejected {
        /// The execution identifier.
        id: u64,
    },

    /// The execution outlived the configured pending TTL.
    #[error("execution {id} expired before approval")]
    ExecutionExpired {
        /// The execution identifier.
        id: u64,
    },

    /// The claim signature scheme is recognized but not supported, or unknown.
    #[error("unsupported signature scheme {scheme}")]
    UnsupportedScheme {
        /// The scheme code carried by the claim.
        scheme: u64,
    },

    /// The signature bytes are malformed or fail verification.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A registry capacity limit would be exceeded.
    #[error("limit exceeded: at most {limit} {what}")]
    LimitExceeded {
        /// What is limited.
        what: String,
        /// The limit.
        limit: usize,
    },

    /// An argument is structurally invalid (zero address, empty topic set).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Token transfers are paused.
    #[error("token is paused")]
    Paused,

    /// The wallet is frozen.
    #[error("wallet {wallet} is frozen")]
    Frozen {
        /// The frozen wallet.
        wallet: String,
    },

    /// The wallet's free balance is below the requested amount.
    #[error("insufficient balance for {wallet}: available {available}, required {required}")]
    InsufficientBalance {
        /// The debited wallet.
        wallet: String,
        /// Unfrozen balance available.
        available: String,
        /// Amount requested.
        required: String,
    },

    /// The wallet is not verified by the identity registry.
    #[error("wallet {wallet} is not verified")]
    NotVerified {
        /// The unverified wallet.
        wallet: String,
    },

    /// A compliance module vetoed the transfer.
    #[error("transfer not compliant")]
    TransferNotCompliant,

    /// A compliance module rejected its configuration call.
    #[error("module call failed: {0}")]
    ModuleCall(String),

    /// Receipt canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl TrexError {
    /// Build an `Unauthorized` error.
    pub fn unauthorized(caller: impl std::fmt::Display, required: impl Into<String>) -> Self {
        Self::Unauthorized {
            caller: caller.to_string(),
            required: required.into(),
        }
    }

    /// Build a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Build an `AlreadyExists` error.
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists { what: what.into() }
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be strings or integers.
    #[error("float values are not permitted in canonical representations; use string or integer for amount: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
