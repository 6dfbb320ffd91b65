//! # trex-registry — Topics, Issuers, Investors
//!
//! The three registries a permissioned token consults before moving value:
//!
//! - [`ClaimTopicsRegistry`]: which claim topics an investor must hold.
//! - [`TrustedIssuersRegistry`]: which issuer identities may attest each
//!   topic.
//! - [`IdentityRegistry`]: which identity and country each wallet has, and
//!   whether the wallet is verified (AND over required topics, OR over
//!   trusted issuers per topic).
//!
//! Registries are owner-configured; the identity registry is operated by
//! agents. Every mutation returns a receipt.

pub mod claim_topics;
pub mod identity_registry;
pub mod trusted_issuers;

pub use claim_topics::{ClaimTopicsRegistry, MAX_CLAIM_TOPICS};
pub use identity_registry::{
    IdentityRegistry, RegistryEntry, SharedClaimTopics, SharedIdentityRegistry,
    SharedTrustedIssuers,
};
pub use trusted_issuers::{
    TrustedIssuer, TrustedIssuersRegistry, MAX_TOPICS_PER_ISSUER, MAX_TRUSTED_ISSUERS,
};
