//! # trex-identity — Identities, Keys, Claims
//!
//! An identity is the on-ledger counterpart of an investor or an issuer.
//! It holds:
//!
//! - **Keys** with purposes (MANAGEMENT, ACTION, CLAIM). MANAGEMENT
//!   satisfies every purpose, and an identity always keeps at least one.
//! - **Claims**: signed attestations by issuers, at most one per
//!   (issuer, topic).
//! - **Executions**: privileged calls gated by an approval threshold.
//!   Self-targeted calls carry an [`IdentityCall`] payload; other targets
//!   go to the host [`Dispatcher`].
//!
//! The [`IdentityDirectory`] owns every deployed identity and resolves
//! issuers during claim validation.
//!
//! ## Crate Policy
//!
//! - Depends on `trex-core` and `trex-crypto` only.
//! - Every mutation issues a receipt before it changes state; failed calls
//!   change nothing.

pub mod call;
pub mod claim_store;
pub mod directory;
pub mod dispatch;
pub mod execution;
pub mod identity;
pub mod key_store;

pub use call::IdentityCall;
pub use claim_store::{Claim, ClaimStore};
pub use directory::{IdentityDirectory, SharedIdentity};
pub use dispatch::{DispatchedCall, Dispatcher, NullDispatcher, RecordingDispatcher};
pub use execution::{
    DispatchOutcome, ExecutionId, ExecutionQueue, ExecutionStatus, PendingExecution,
};
pub use identity::{ExecutionTicket, Identity, IssuerLookup};
pub use key_store::{Key, KeyStore};
