//! # Identity Directory
//!
//! The set of deployed identities, addressed by identity address. Registries
//! hold identity addresses and resolve them here; claim validation resolves
//! issuers here.
//!
//! ## Locking
//!
//! The map lock is held only long enough to clone an identity handle.
//! Readers take identity locks with `read_recursive` so a validation that
//! touches the same identity twice (self-issued claims) cannot deadlock
//! behind a queued writer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use trex_core::abi::{self, Token};
use trex_core::{
    keccak256, Address, IdentityPolicy, KeyId, KeyPurpose, KeyType, Timestamp, Topic, TrexError,
};

use crate::dispatch::{Dispatcher, NullDispatcher};
use crate::execution::ExecutionId;
use crate::identity::{Identity, IssuerLookup};

/// Shared handle to one identity.
pub type SharedIdentity = Arc<RwLock<Identity>>;

const DEPLOY_DOMAIN: &[u8] = b"trex.identity";

/// All identities known to the host.
pub struct IdentityDirectory {
    identities: RwLock<BTreeMap<Address, SharedIdentity>>,
    nonce: AtomicU64,
    policy: IdentityPolicy,
    dispatcher: Arc<dyn Dispatcher>,
}

impl std::fmt::Debug for IdentityDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityDirectory")
            .field("identities", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Default for IdentityDirectory {
    fn default() -> Self {
        Self::with_valid_policy(IdentityPolicy::default(), Arc::new(NullDispatcher))
    }
}

impl IdentityDirectory {
    /// An empty directory whose identities use `policy` and `dispatcher`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `policy` has a zero threshold or a zero TTL.
    pub fn new(policy: IdentityPolicy, dispatcher: Arc<dyn Dispatcher>) -> Result<Self, TrexError> {
        policy
            .validate()
            .map_err(|e| TrexError::InvalidInput(e.to_string()))?;
        Ok(Self::with_valid_policy(policy, dispatcher))
    }

    fn with_valid_policy(policy: IdentityPolicy, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            identities: RwLock::new(BTreeMap::new()),
            nonce: AtomicU64::new(0),
            policy,
            dispatcher,
        }
    }

    /// Deploy a new identity whose only key is the MANAGEMENT key of
    /// `initial_management`. Returns the identity address.
    pub fn deploy_identity(&self, initial_management: &Address) -> Result<Address, TrexError> {
        if initial_management.is_zero() {
            return Err(TrexError::InvalidInput(
                "initial management key cannot be the zero address".into(),
            ));
        }
        let key = KeyId::from_address(initial_management);
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let address = Address::from_word(&keccak256(&abi::encode(&[
            Token::Bytes(DEPLOY_DOMAIN),
            Token::Uint(nonce),
            Token::Bytes(key.as_bytes()),
        ])));
        let identity = Identity::new(
            address,
            key,
            KeyType::Ecdsa,
            self.policy,
            Arc::clone(&self.dispatcher),
        )?;
        self.identities
            .write()
            .insert(address, Arc::new(RwLock::new(identity)));
        tracing::info!(identity = %address, management = %initial_management, "identity deployed");
        Ok(address)
    }

    /// Handle to the identity at `address`.
    pub fn get(&self, address: &Address) -> Option<SharedIdentity> {
        self.identities.read().get(address).cloned()
    }

    /// Handle to the identity at `address`, or `NotFound`.
    pub fn require(&self, address: &Address) -> Result<SharedIdentity, TrexError> {
        self.get(address)
            .ok_or_else(|| TrexError::not_found(format!("identity {address}")))
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.identities.read().contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.identities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.read().is_empty()
    }

    /// Validate a claim held by `identity`. `Ok(false)` when the identity
    /// is unknown or holds no matching claim.
    pub fn is_claim_valid(
        &self,
        identity: &Address,
        topic: Topic,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, TrexError> {
        let Some(handle) = self.get(identity) else {
            return Ok(false);
        };
        let subject = handle.read_recursive();
        subject.is_claim_valid(self, topic, signature, data)
    }

    /// Expire stale executions across every identity. Returns the expired
    /// `(identity, execution)` pairs.
    pub fn expire_pending(&self, now: Timestamp) -> Vec<(Address, ExecutionId)> {
        let handles: Vec<(Address, SharedIdentity)> = self
            .identities
            .read()
            .iter()
            .map(|(a, h)| (*a, Arc::clone(h)))
            .collect();
        handles
            .into_iter()
            .flat_map(|(address, handle)| {
                let expired = handle.write().expire_pending(now);
                expired.into_iter().map(move |id| (address, id))
            })
            .collect()
    }
}

impl IssuerLookup for IdentityDirectory {
    fn key_has_purpose(&self, issuer: &Address, key: &KeyId, purpose: KeyPurpose) -> bool {
        self.get(issuer)
            .is_some_and(|h| h.read_recursive().key_has_purpose(key, purpose))
    }

    fn is_signature_revoked(&self, issuer: &Address, signature: &[u8]) -> bool {
        self.get(issuer)
            .is_some_and(|h| h.read_recursive().is_claim_revoked(signature))
    }
}
