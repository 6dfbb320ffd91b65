//! # trex-crypto — Claim Signature Primitives
//!
//! Provides the cryptographic building blocks for claim validation:
//!
//! - **Claim hashing.** `claim_data_hash(identity, topic, data)` and the
//!   Ethereum personal-message digest every scheme signs.
//! - **secp256k1 ECDSA** signing and public-key recovery (scheme `1`).
//! - **Ed25519** signing and envelope verification (scheme `4`).
//! - **Scheme dispatch.** `recover_signer` maps a scheme code and signature
//!   to the signer's address; `get_recovered_address` detects the scheme
//!   from the signature length.
//!
//! ## Crate Policy
//!
//! - Depends only on `trex-core` internally.
//! - No mocking of cryptographic operations in tests: all tests use real
//!   keys, real Keccak-256, real curve arithmetic.
//! - Private keys never implement `Serialize` or print in `Debug`.

pub mod ecdsa;
pub mod ed25519;
pub mod error;
pub mod hash;
pub mod scheme;

pub use ecdsa::{RecoverableSignature, Secp256k1KeyPair};
pub use ed25519::{Ed25519Envelope, Ed25519KeyPair, Ed25519PublicKey};
pub use error::CryptoError;
pub use hash::{claim_data_hash, eth_signed_message_hash};
pub use scheme::{get_recovered_address, recover_signer, ClaimSigner, SignatureScheme};
