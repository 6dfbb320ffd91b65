//! # trex-core — Foundational Types for the T-REX Core
//!
//! This crate is the leaf of the workspace DAG. It defines the primitives
//! every other `trex-*` crate builds on:
//!
//! 1. **Fixed-width identifiers.** `Address` (20 bytes), `KeyId` and
//!    `ClaimId` (32 bytes) are newtypes with hex serde. No bare byte vectors
//!    for identifiers.
//!
//! 2. **ABI word hashing.** Claim identifiers, key identifiers, and claim
//!    signing digests are Keccak-256 over ABI-encoded words (`abi` module),
//!    so signatures produced by Ethereum tooling verify here unchanged.
//!
//! 3. **`CanonicalBytes` for receipts.** Every mutation receipt hash flows
//!    through JCS canonicalization before SHA-256, so receipts are
//!    reproducible byte-for-byte by any auditor.
//!
//! 4. **Explicit role records.** Owner/agent authority is a value
//!    (`AccessControl`) carried by each registry, never a global.
//!
//! 5. **One error enum.** `TrexError` carries every failure kind of the
//!    identity, registry, compliance, and token layers.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `trex-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod abi;
pub mod access;
pub mod canonical;
pub mod config;
pub mod country;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod purpose;
pub mod receipt;
pub mod temporal;

/// Token amounts are unsigned 256-bit integers.
pub type Amount = primitive_types::U256;

pub use access::{AccessControl, Role};
pub use canonical::CanonicalBytes;
pub use config::{ComplianceConfig, ConfigError, EvaluationMode, IdentityPolicy, StackConfig};
pub use country::{CountryCode, InvestorCountry};
pub use digest::{keccak256, sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, TrexError};
pub use identity::{Address, ClaimId, KeyId, Topic};
pub use purpose::{KeyPurpose, KeyType, PurposeSet};
pub use receipt::{Finality, Receipt, ReceiptBook};
pub use temporal::Timestamp;
