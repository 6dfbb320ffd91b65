//! # Identity Management Calls
//!
//! Payload format of executions that target the identity itself. The
//! payload is the JSON encoding of an [`IdentityCall`]; dispatch decodes it
//! and applies it with the identity's own authority.

use serde::{Deserialize, Serialize};
use trex_core::encoding::serde_hex;
use trex_core::{ClaimId, KeyId, KeyPurpose, KeyType, PurposeSet, TrexError};

use crate::claim_store::Claim;

/// A management operation an identity can execute on itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum IdentityCall {
    /// Grant purposes to a key.
    AddKey {
        key: KeyId,
        purposes: PurposeSet,
        key_type: KeyType,
    },
    /// Remove one purpose from a key.
    RemoveKey { key: KeyId, purpose: KeyPurpose },
    /// Store a claim.
    AddClaim { claim: Claim },
    /// Remove a claim.
    RemoveClaim { claim_id: ClaimId },
    /// Revoke a claim signature this identity issued.
    RevokeClaimSignature {
        #[serde(with = "serde_hex")]
        signature: Vec<u8>,
    },
}

impl IdentityCall {
    /// Encode as an execution payload.
    pub fn encode(&self) -> Result<Vec<u8>, TrexError> {
        serde_json::to_vec(self)
            .map_err(|e| TrexError::InvalidInput(format!("identity call encoding: {e}")))
    }

    /// Decode an execution payload.
    pub fn decode(data: &[u8]) -> Result<Self, TrexError> {
        serde_json::from_slice(data)
            .map_err(|e| TrexError::InvalidInput(format!("identity call decoding: {e}")))
    }

    /// Operation name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddKey { .. } => "add_key",
            Self::RemoveKey { .. } => "remove_key",
            Self::AddClaim { .. } => "add_claim",
            Self::RemoveClaim { .. } => "remove_claim",
            Self::RevokeClaimSignature { .. } => "revoke_claim_signature",
        }
    }
}
