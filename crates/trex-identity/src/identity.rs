//! # Identity
//!
//! An on-ledger identity: one key store, one claim store, one execution
//! queue, plus the set of claim signatures it has revoked as an issuer.
//!
//! ## Authorization
//!
//! A caller is an account address; its key in the store is
//! `KeyId::from_address(caller)`. MANAGEMENT satisfies every purpose.
//! Calls made by the identity itself (dispatched management calls) carry
//! the identity's own authority.
//!
//! | Operation | Requires |
//! |-----------|----------|
//! | `add_key`, `remove_key`, `revoke_claim_signature` | MANAGEMENT |
//! | `add_claim`, `remove_claim` | CLAIM |
//! | `execute` | any purpose |
//! | `approve` | MANAGEMENT for self-targeted calls, ACTION otherwise |
//!
//! ## Security Invariant
//!
//! Every mutation validates first, then issues its receipt, then applies
//! infallible state changes. A failed call leaves the identity unchanged:
//! approving a stale execution reports `ExecutionExpired` without touching
//! it, and only `expire_pending` moves it to `Expired`.
//!
//! The approval threshold counts only approvers that still hold the
//! execution's required purpose when the count is taken.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use trex_core::encoding::to_prefixed_hex;
use trex_core::{
    keccak256, Address, Amount, ClaimId, IdentityPolicy, KeyId, KeyPurpose, KeyType, PurposeSet,
    Receipt, ReceiptBook, Timestamp, Topic, TrexError,
};
use trex_crypto::{claim_data_hash, recover_signer, SignatureScheme};

use crate::call::IdentityCall;
use crate::claim_store::{Claim, ClaimStore};
use crate::dispatch::Dispatcher;
use crate::execution::{
    DispatchOutcome, ExecutionId, ExecutionQueue, ExecutionStatus, PendingExecution,
};
use crate::key_store::{Key, KeyStore};

/// Resolves issuer-side facts needed to validate a claim.
pub trait IssuerLookup {
    /// Whether `issuer` holds `key` with a purpose covering `purpose`.
    /// False when the issuer is unknown.
    fn key_has_purpose(&self, issuer: &Address, key: &KeyId, purpose: KeyPurpose) -> bool;

    /// Whether `issuer` has revoked `signature`.
    fn is_signature_revoked(&self, issuer: &Address, signature: &[u8]) -> bool;
}

/// Result of `execute` or `approve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTicket {
    /// The execution.
    pub id: ExecutionId,
    /// Status after the call.
    pub status: ExecutionStatus,
    /// `None` when the call changed nothing (duplicate approval).
    pub receipt: Option<Receipt>,
}

/// An identity with keys, claims, and pending executions.
pub struct Identity {
    address: Address,
    keys: KeyStore,
    claims: ClaimStore,
    executions: ExecutionQueue,
    revoked_signatures: BTreeSet<[u8; 32]>,
    policy: IdentityPolicy,
    dispatcher: Arc<dyn Dispatcher>,
    receipts: ReceiptBook,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .field("keys", &self.keys.len())
            .field("claims", &self.claims.len())
            .field("next_execution", &self.executions.next_id())
            .finish()
    }
}

impl Identity {
    /// Create an identity at `address` whose only key is `management_key`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `policy` has a zero threshold or a zero TTL.
    pub fn new(
        address: Address,
        management_key: KeyId,
        key_type: KeyType,
        policy: IdentityPolicy,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<Self, TrexError> {
        policy
            .validate()
            .map_err(|e| TrexError::InvalidInput(e.to_string()))?;
        Ok(Self {
            address,
            keys: KeyStore::with_management_key(management_key, key_type),
            claims: ClaimStore::default(),
            executions: ExecutionQueue::default(),
            revoked_signatures: BTreeSet::new(),
            policy,
            dispatcher,
            receipts: ReceiptBook::new(address),
        })
    }

    /// This identity's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The approval policy in force.
    pub fn policy(&self) -> IdentityPolicy {
        self.policy
    }

    fn is_self(&self, caller: &Address) -> bool {
        *caller == self.address
    }

    fn require_purpose(&self, caller: &Address, purpose: KeyPurpose) -> Result<(), TrexError> {
        if self.is_self(caller) || self.keys.has_purpose(&KeyId::from_address(caller), purpose) {
            return Ok(());
        }
        tracing::warn!(
            identity = %self.address,
            caller = %caller,
            required = %purpose,
            "identity call rejected: missing key purpose"
        );
        Err(TrexError::unauthorized(caller, purpose.as_str()))
    }

    // ── Keys ───────────────────────────────────────────────────────────

    /// Grant `purposes` to `key`, creating the key if absent.
    pub fn add_key(
        &mut self,
        caller: &Address,
        key: KeyId,
        purposes: PurposeSet,
        key_type: KeyType,
    ) -> Result<Receipt, TrexError> {
        self.require_purpose(caller, KeyPurpose::Management)?;
        self.keys.check_add(&key, &purposes)?;
        let receipt = self.receipts.issue(
            "add_key",
            &json!({ "key": key, "purposes": purposes, "key_type": key_type }),
        )?;
        self.keys.insert(key, &purposes, key_type);
        tracing::info!(identity = %self.address, key = %key, purposes = %purposes, "key added");
        Ok(receipt)
    }

    /// Remove one purpose from `key`; the key is deleted when none remain.
    pub fn remove_key(
        &mut self,
        caller: &Address,
        key: &KeyId,
        purpose: KeyPurpose,
    ) -> Result<Receipt, TrexError> {
        self.require_purpose(caller, KeyPurpose::Management)?;
        self.keys.check_remove(key, purpose)?;
        let receipt = self
            .receipts
            .issue("remove_key", &json!({ "key": key, "purpose": purpose }))?;
        self.keys.remove(key, purpose);
        tracing::info!(identity = %self.address, key = %key, purpose = %purpose, "key purpose removed");
        Ok(receipt)
    }

    /// The key, if present.
    pub fn get_key(&self, key: &KeyId) -> Option<&Key> {
        self.keys.get(key)
    }

    /// The key's purposes; empty if absent.
    pub fn get_key_purposes(&self, key: &KeyId) -> PurposeSet {
        self.keys.purposes(key)
    }

    /// Keys holding exactly `purpose`.
    pub fn get_keys_by_purpose(&self, purpose: KeyPurpose) -> Vec<KeyId> {
        self.keys.keys_by_purpose(purpose)
    }

    /// Whether `key` satisfies `purpose`.
    pub fn key_has_purpose(&self, key: &KeyId, purpose: KeyPurpose) -> bool {
        self.keys.has_purpose(key, purpose)
    }

    // ── Claims ─────────────────────────────────────────────────────────

    /// Store `claim`, replacing any claim from the same issuer on the same
    /// topic. Returns the claim id.
    pub fn add_claim(
        &mut self,
        caller: &Address,
        claim: Claim,
    ) -> Result<(ClaimId, Receipt), TrexError> {
        self.require_purpose(caller, KeyPurpose::Claim)?;
        if claim.issuer.is_zero() {
            return Err(TrexError::InvalidInput("claim issuer cannot be the zero address".into()));
        }
        let receipt = self.receipts.issue(
            "add_claim",
            &json!({
                "claim_id": claim.id(),
                "topic": claim.topic,
                "scheme": claim.scheme,
                "issuer": claim.issuer,
                "signature": to_prefixed_hex(&claim.signature),
            }),
        )?;
        let (topic, issuer) = (claim.topic, claim.issuer);
        let (id, replaced) = self.claims.insert(claim);
        tracing::info!(
            identity = %self.address,
            claim_id = %id,
            topic = topic.value(),
            issuer = %issuer,
            replaced,
            "claim stored"
        );
        Ok((id, receipt))
    }

    /// Remove a claim.
    pub fn remove_claim(
        &mut self,
        caller: &Address,
        claim_id: &ClaimId,
    ) -> Result<Receipt, TrexError> {
        self.require_purpose(caller, KeyPurpose::Claim)?;
        self.claims.check_remove(claim_id)?;
        let receipt = self
            .receipts
            .issue("remove_claim", &json!({ "claim_id": claim_id }))?;
        self.claims.remove(claim_id);
        tracing::info!(identity = %self.address, claim_id = %claim_id, "claim removed");
        Ok(receipt)
    }

    /// The claim, if present.
    pub fn get_claim(&self, claim_id: &ClaimId) -> Option<&Claim> {
        self.claims.get(claim_id)
    }

    /// Claim ids stored under `topic`.
    pub fn get_claim_ids_by_topic(&self, topic: Topic) -> Vec<ClaimId> {
        self.claims.ids_by_topic(topic)
    }

    /// As an issuer, revoke a claim signature so claims carrying it stop
    /// validating.
    pub fn revoke_claim_signature(
        &mut self,
        caller: &Address,
        signature: &[u8],
    ) -> Result<Receipt, TrexError> {
        self.require_purpose(caller, KeyPurpose::Management)?;
        let digest = keccak256(signature);
        if self.revoked_signatures.contains(&digest) {
            return Err(TrexError::already_exists("revoked claim signature"));
        }
        let receipt = self.receipts.issue(
            "revoke_claim_signature",
            &json!({ "signature": to_prefixed_hex(signature) }),
        )?;
        self.revoked_signatures.insert(digest);
        tracing::info!(identity = %self.address, "claim signature revoked");
        Ok(receipt)
    }

    /// Whether this identity, as an issuer, revoked `signature`.
    pub fn is_claim_revoked(&self, signature: &[u8]) -> bool {
        self.revoked_signatures.contains(&keccak256(signature))
    }

    /// Validate a claim held by this identity.
    ///
    /// Finds the stored claim on `topic` with exactly this `signature` and
    /// `data` (none: `Ok(false)`), derives the signer from the signature
    /// under the stored claim's scheme, and accepts iff the issuer holds
    /// the signer's key with CLAIM purpose and has not revoked the
    /// signature.
    ///
    /// # Errors
    ///
    /// `UnsupportedScheme` for schemes other than ECDSA and Ed25519,
    /// `InvalidSignature` for malformed or unverifiable signatures.
    pub fn is_claim_valid(
        &self,
        issuers: &dyn IssuerLookup,
        topic: Topic,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, TrexError> {
        let Some(claim) = self.claims.find(topic, signature, data) else {
            tracing::debug!(identity = %self.address, topic = topic.value(), "no stored claim matches");
            return Ok(false);
        };
        self.verify_claim(issuers, claim)
    }

    /// Validate one claim against this identity as subject. Same rules and
    /// errors as [`Identity::is_claim_valid`], without the store lookup.
    pub fn verify_claim(
        &self,
        issuers: &dyn IssuerLookup,
        claim: &Claim,
    ) -> Result<bool, TrexError> {
        let scheme = SignatureScheme::from_code(claim.scheme)?;
        let data_hash = claim_data_hash(&self.address, claim.topic, &claim.data);
        let signer = recover_signer(scheme, &claim.signature, &data_hash)?;
        let signer_key = KeyId::from_address(&signer);

        let (has_key, revoked) = if claim.issuer == self.address {
            (
                self.keys.has_purpose(&signer_key, KeyPurpose::Claim),
                self.is_claim_revoked(&claim.signature),
            )
        } else {
            (
                issuers.key_has_purpose(&claim.issuer, &signer_key, KeyPurpose::Claim),
                issuers.is_signature_revoked(&claim.issuer, &claim.signature),
            )
        };
        tracing::debug!(
            identity = %self.address,
            issuer = %claim.issuer,
            signer = %signer,
            has_key,
            revoked,
            "claim signature checked"
        );
        Ok(has_key && !revoked)
    }

    /// Recover the signer address of `signature` over `data_hash`.
    pub fn get_recovered_address(
        &self,
        signature: &[u8],
        data_hash: &[u8; 32],
    ) -> Result<Address, TrexError> {
        Ok(trex_crypto::get_recovered_address(signature, data_hash)?)
    }

    // ── Executions ─────────────────────────────────────────────────────

    /// Submit a call for approval; see [`Identity::execute_at`].
    pub fn execute(
        &mut self,
        caller: &Address,
        to: Address,
        value: Amount,
        data: Vec<u8>,
    ) -> Result<ExecutionTicket, TrexError> {
        self.execute_at(caller, to, value, data, Timestamp::now())
    }

    /// Submit a call for approval at time `now`.
    ///
    /// The caller must hold some key. If its key satisfies the required
    /// purpose, its approval is recorded immediately and, when that meets
    /// the threshold, the call is dispatched in the same step.
    pub fn execute_at(
        &mut self,
        caller: &Address,
        to: Address,
        value: Amount,
        data: Vec<u8>,
        now: Timestamp,
    ) -> Result<ExecutionTicket, TrexError> {
        let key = KeyId::from_address(caller);
        if !self.is_self(caller) && !self.keys.contains(&key) {
            tracing::warn!(identity = %self.address, caller = %caller, "execute rejected: caller holds no key");
            return Err(TrexError::unauthorized(caller, "any key purpose"));
        }
        let required = if to == self.address {
            KeyPurpose::Management
        } else {
            KeyPurpose::Action
        };
        let receipt = self.receipts.issue(
            "execute",
            &json!({
                "id": self.executions.next_id(),
                "to": to,
                "value": value,
                "data": to_prefixed_hex(&data),
            }),
        )?;
        let id = self.executions.submit(to, value, data, required, now);
        tracing::info!(identity = %self.address, id, to = %to, required = %required, "execution requested");

        let status = if self.is_self(caller) || self.keys.has_purpose(&key, required) {
            self.record_approval(id, key)
        } else {
            ExecutionStatus::Pending
        };
        Ok(ExecutionTicket {
            id,
            status,
            receipt: Some(receipt),
        })
    }

    /// Approve or reject a pending execution; see [`Identity::approve_at`].
    pub fn approve(
        &mut self,
        caller: &Address,
        id: ExecutionId,
        decision: bool,
    ) -> Result<ExecutionTicket, TrexError> {
        self.approve_at(caller, id, decision, Timestamp::now())
    }

    /// Approve (`decision = true`) or reject a pending execution at `now`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id; `AlreadyExecuted`, `ExecutionRejected`,
    /// `ExecutionExpired` for closed executions; `Unauthorized` if the
    /// caller's key does not satisfy the execution's required purpose.
    pub fn approve_at(
        &mut self,
        caller: &Address,
        id: ExecutionId,
        decision: bool,
        now: Timestamp,
    ) -> Result<ExecutionTicket, TrexError> {
        let key = KeyId::from_address(caller);
        let (required, stale, already_approved, status) = {
            let exec = self.executions.require(id)?;
            exec.require_open()?;
            (
                exec.required_purpose,
                exec.is_stale(self.policy.pending_ttl_secs, &now),
                exec.approvals.contains(&key),
                exec.status,
            )
        };
        self.require_purpose(caller, required)?;

        if stale {
            tracing::warn!(identity = %self.address, id, "approval refused: execution outlived its ttl");
            return Err(TrexError::ExecutionExpired { id });
        }

        if !decision {
            let receipt = self
                .receipts
                .issue("approve", &json!({ "id": id, "approve": false, "key": key }))?;
            self.executions.mark_rejected(id);
            tracing::info!(identity = %self.address, id, caller = %caller, "execution rejected");
            return Ok(ExecutionTicket {
                id,
                status: ExecutionStatus::Rejected,
                receipt: Some(receipt),
            });
        }

        if already_approved {
            tracing::debug!(identity = %self.address, id, key = %key, "duplicate approval ignored");
            return Ok(ExecutionTicket {
                id,
                status,
                receipt: None,
            });
        }

        let receipt = self
            .receipts
            .issue("approve", &json!({ "id": id, "approve": true, "key": key }))?;
        let status = self.record_approval(id, key);
        Ok(ExecutionTicket {
            id,
            status,
            receipt: Some(receipt),
        })
    }

    /// Expire every pending execution older than the configured TTL.
    /// Returns the expired ids. No-op when no TTL is configured.
    pub fn expire_pending(&mut self, now: Timestamp) -> Vec<ExecutionId> {
        let stale = self.executions.stale(self.policy.pending_ttl_secs, &now);
        for id in &stale {
            self.executions.mark_expired(*id);
        }
        if !stale.is_empty() {
            tracing::info!(identity = %self.address, count = stale.len(), "pending executions expired");
        }
        stale
    }

    /// The execution, if present.
    pub fn get_execution(&self, id: ExecutionId) -> Option<&PendingExecution> {
        self.executions.get(id)
    }

    /// All executions in id order.
    pub fn executions(&self) -> impl Iterator<Item = &PendingExecution> {
        self.executions.iter()
    }

    /// Whether `key` may currently approve for `purpose`. The identity's
    /// own key stands for dispatched self-calls.
    fn can_approve(&self, key: &KeyId, purpose: KeyPurpose) -> bool {
        *key == KeyId::from_address(&self.address) || self.keys.has_purpose(key, purpose)
    }

    fn record_approval(&mut self, id: ExecutionId, key: KeyId) -> ExecutionStatus {
        self.executions.record_approval(id, key);
        let live = self.executions.get(id).map_or(0, |exec| {
            exec.live_approvals(|k| self.can_approve(k, exec.required_purpose))
        });
        tracing::debug!(identity = %self.address, id, approvals = live, "approval recorded");
        if live >= self.policy.approval_threshold as usize {
            self.dispatch(id);
        }
        self.executions
            .get(id)
            .map_or(ExecutionStatus::Pending, |e| e.status)
    }

    fn dispatch(&mut self, id: ExecutionId) {
        let Some((to, value, data)) = self.executions.begin_dispatch(id) else {
            return;
        };
        let outcome = if to == self.address {
            match IdentityCall::decode(&data).and_then(|call| self.apply_call(call)) {
                Ok(()) => DispatchOutcome::Applied,
                Err(e) => DispatchOutcome::Failed {
                    reason: e.to_string(),
                },
            }
        } else {
            match self.dispatcher.dispatch(&self.address, &to, value, &data) {
                Ok(output) => DispatchOutcome::Delegated { output },
                Err(e) => DispatchOutcome::Failed {
                    reason: e.to_string(),
                },
            }
        };
        match &outcome {
            DispatchOutcome::Failed { reason } => {
                tracing::warn!(identity = %self.address, id, to = %to, reason = %reason, "execution dispatch failed")
            }
            _ => tracing::info!(identity = %self.address, id, to = %to, "execution dispatched"),
        }
        self.executions.record_outcome(id, outcome);
    }

    fn apply_call(&mut self, call: IdentityCall) -> Result<(), TrexError> {
        let me = self.address;
        tracing::debug!(identity = %me, call = call.name(), "applying management call");
        match call {
            IdentityCall::AddKey {
                key,
                purposes,
                key_type,
            } => {
                self.add_key(&me, key, purposes, key_type)?;
            }
            IdentityCall::RemoveKey { key, purpose } => {
                self.remove_key(&me, &key, purpose)?;
            }
            IdentityCall::AddClaim { claim } => {
                self.add_claim(&me, claim)?;
            }
            IdentityCall::RemoveClaim { claim_id } => {
                self.remove_claim(&me, &claim_id)?;
            }
            IdentityCall::RevokeClaimSignature { signature } => {
                self.revoke_claim_signature(&me, &signature)?;
            }
        }
        Ok(())
    }
}
