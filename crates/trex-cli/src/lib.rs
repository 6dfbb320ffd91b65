//! # trex-cli — Operator CLI for the T-REX Core
//!
//! Provides the `trex` command-line interface:
//!
//! - `trex keygen` — generate an ECDSA or Ed25519 claim-signing key.
//! - `trex sign-claim` — sign a claim about a subject identity.
//! - `trex recover` — recover the signer address of a claim signature.
//! - `trex verify` — evaluate a YAML investor scenario offline.
//!
//! ```bash
//! trex keygen --scheme ed25519 --output keys --prefix kyc
//! trex sign-claim --key keys/kyc.key --scheme ed25519 --identity 0x.. --topic 7 --data 0x6b7963
//! trex verify --config scenario.yaml --require-all
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; validation logic lives in the domain
//!   crates.
//! - Handlers return an exit code; errors surface through `anyhow`.

pub mod keys;
pub mod scenario;
