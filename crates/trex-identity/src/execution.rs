//! # Execution Queue
//!
//! Privileged actions awaiting multi-party approval.
//!
//! ## State Machine
//!
//! ```text
//!   Pending ──approve──▶ Approved ──approve (threshold)──▶ Executed
//!      │                    │
//!      ├──────reject────────┤──────▶ Rejected
//!      │                    │
//!      └──────ttl elapsed───┴──────▶ Expired
//! ```
//!
//! `Pending` may also go straight to `Executed` when a single approval
//! meets the threshold. `Executed`, `Rejected`, and `Expired` are terminal;
//! a terminal execution is never resurrected, and ids are never reused.
//!
//! ## Security Invariant
//!
//! An execution is dispatched at most once. The queue records the
//! transition to `Executed` before the owner runs the payload, and every
//! approval path checks for a terminal state first.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use trex_core::encoding::serde_hex;
use trex_core::{Address, Amount, KeyId, KeyPurpose, Timestamp, TrexError};

/// Monotonic execution identifier, unique within one identity.
pub type ExecutionId = u64;

// ── Execution Status ───────────────────────────────────────────────────

/// Lifecycle state of a pending execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Submitted, no approvals.
    Pending,
    /// At least one approval, below the threshold.
    Approved,
    /// Dispatched. Terminal.
    Executed,
    /// Explicitly disapproved. Terminal.
    Rejected,
    /// Outlived the pending TTL. Terminal.
    Expired,
}

impl ExecutionStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Executed => "EXECUTED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Whether no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Rejected | Self::Expired)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when an execution was dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A self-targeted management call was applied.
    Applied,
    /// An external call was handed to the dispatcher.
    Delegated {
        /// Return data from the dispatcher.
        #[serde(with = "serde_hex")]
        output: Vec<u8>,
    },
    /// The call failed. The execution is still consumed.
    Failed {
        /// Failure description.
        reason: String,
    },
}

impl DispatchOutcome {
    /// Whether the dispatched call succeeded.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

// ── Pending Execution ──────────────────────────────────────────────────

/// A privileged action awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingExecution {
    /// Identifier.
    pub id: ExecutionId,
    /// Call target. The identity's own address marks a management call.
    pub to: Address,
    /// Value forwarded with the call.
    pub value: Amount,
    /// Call payload.
    #[serde(with = "serde_hex")]
    pub data: Vec<u8>,
    /// Purpose an approver must satisfy.
    pub required_purpose: KeyPurpose,
    /// Distinct approving keys.
    pub approvals: BTreeSet<KeyId>,
    /// Current status.
    pub status: ExecutionStatus,
    /// Submission time.
    pub created_at: Timestamp,
    /// Set once dispatched.
    pub outcome: Option<DispatchOutcome>,
}

impl PendingExecution {
    /// Fail with the error matching a terminal status.
    pub fn require_open(&self) -> Result<(), TrexError> {
        match self.status {
            ExecutionStatus::Executed => Err(TrexError::AlreadyExecuted { id: self.id }),
            ExecutionStatus::Rejected => Err(TrexError::ExecutionRejected { id: self.id }),
            ExecutionStatus::Expired => Err(TrexError::ExecutionExpired { id: self.id }),
            ExecutionStatus::Pending | ExecutionStatus::Approved => Ok(()),
        }
    }

    /// Approvals whose key `authorized` still accepts. Keys that lost the
    /// required purpose after approving do not count.
    pub fn live_approvals(&self, authorized: impl Fn(&KeyId) -> bool) -> usize {
        self.approvals.iter().filter(|k| authorized(k)).count()
    }

    /// Whether the execution has outlived `ttl_secs` at `now`.
    pub fn is_stale(&self, ttl_secs: Option<u64>, now: &Timestamp) -> bool {
        !self.status.is_terminal()
            && ttl_secs.is_some_and(|ttl| now.secs_since(&self.created_at) > ttl)
    }
}

// ── Queue ──────────────────────────────────────────────────────────────

/// All executions of one identity, by id.
#[derive(Debug, Clone, Default)]
pub struct ExecutionQueue {
    next_id: ExecutionId,
    executions: BTreeMap<ExecutionId, PendingExecution>,
}

impl ExecutionQueue {
    /// The id the next submission will receive.
    pub fn next_id(&self) -> ExecutionId {
        self.next_id
    }

    /// Record a new pending execution and return its id.
    pub fn submit(
        &mut self,
        to: Address,
        value: Amount,
        data: Vec<u8>,
        required_purpose: KeyPurpose,
        now: Timestamp,
    ) -> ExecutionId {
        let id = self.next_id;
        self.next_id += 1;
        self.executions.insert(
            id,
            PendingExecution {
                id,
                to,
                value,
                data,
                required_purpose,
                approvals: BTreeSet::new(),
                status: ExecutionStatus::Pending,
                created_at: now,
                outcome: None,
            },
        );
        id
    }

    /// The execution, if present.
    pub fn get(&self, id: ExecutionId) -> Option<&PendingExecution> {
        self.executions.get(&id)
    }

    /// The execution, or `NotFound`.
    pub fn require(&self, id: ExecutionId) -> Result<&PendingExecution, TrexError> {
        self.executions
            .get(&id)
            .ok_or_else(|| TrexError::not_found(format!("execution {id}")))
    }

    /// Add an approval. Returns the raw approval count afterwards, or
    /// `None` if the key had already approved or the id is unknown.
    pub fn record_approval(&mut self, id: ExecutionId, key: KeyId) -> Option<usize> {
        let exec = self.executions.get_mut(&id)?;
        if !exec.approvals.insert(key) {
            return None;
        }
        exec.status = ExecutionStatus::Approved;
        Some(exec.approvals.len())
    }

    /// Move to `Rejected`.
    pub fn mark_rejected(&mut self, id: ExecutionId) {
        self.set_status(id, ExecutionStatus::Rejected);
    }

    /// Move to `Expired`.
    pub fn mark_expired(&mut self, id: ExecutionId) {
        self.set_status(id, ExecutionStatus::Expired);
    }

    /// Move to `Executed` and return the call to dispatch. `None` if the
    /// execution is unknown or already terminal.
    pub fn begin_dispatch(&mut self, id: ExecutionId) -> Option<(Address, Amount, Vec<u8>)> {
        let exec = self.executions.get_mut(&id)?;
        if exec.status.is_terminal() {
            return None;
        }
        exec.status = ExecutionStatus::Executed;
        Some((exec.to, exec.value, exec.data.clone()))
    }

    /// Attach the dispatch outcome.
    pub fn record_outcome(&mut self, id: ExecutionId, outcome: DispatchOutcome) {
        if let Some(exec) = self.executions.get_mut(&id) {
            exec.outcome = Some(outcome);
        }
    }

    /// Ids of non-terminal executions older than `ttl_secs` at `now`.
    pub fn stale(&self, ttl_secs: Option<u64>, now: &Timestamp) -> Vec<ExecutionId> {
        self.executions
            .values()
            .filter(|e| e.is_stale(ttl_secs, now))
            .map(|e| e.id)
            .collect()
    }

    /// Executions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingExecution> {
        self.executions.values()
    }

    fn set_status(&mut self, id: ExecutionId, status: ExecutionStatus) {
        if let Some(exec) = self.executions.get_mut(&id) {
            exec.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(1_800_000_000 + secs).unwrap()
    }

    fn submit(queue: &mut ExecutionQueue) -> ExecutionId {
        queue.submit(Address([9; 20]), Amount::zero(), vec![1, 2], KeyPurpose::Action, t(0))
    }

    #[test]
    fn ids_are_monotonic() {
        let mut q = ExecutionQueue::default();
        assert_eq!(submit(&mut q), 0);
        assert_eq!(submit(&mut q), 1);
        assert_eq!(q.next_id(), 2);
    }

    #[test]
    fn duplicate_approval_not_counted() {
        let mut q = ExecutionQueue::default();
        let id = submit(&mut q);
        let k = KeyId::from_bytes([1; 32]);
        assert_eq!(q.record_approval(id, k), Some(1));
        assert_eq!(q.record_approval(id, k), None);
        assert_eq!(q.get(id).unwrap().status, ExecutionStatus::Approved);
    }

    #[test]
    fn live_approvals_filter_by_current_authority() {
        let mut q = ExecutionQueue::default();
        let id = submit(&mut q);
        let revoked = KeyId::from_bytes([1; 32]);
        let current = KeyId::from_bytes([2; 32]);
        q.record_approval(id, revoked);
        assert_eq!(q.record_approval(id, current), Some(2));
        let exec = q.get(id).unwrap();
        assert_eq!(exec.live_approvals(|k| *k == current), 1);
        assert_eq!(exec.live_approvals(|_| false), 0);
    }

    #[test]
    fn dispatch_only_once() {
        let mut q = ExecutionQueue::default();
        let id = submit(&mut q);
        assert!(q.begin_dispatch(id).is_some());
        assert!(q.begin_dispatch(id).is_none());
        assert!(matches!(
            q.get(id).unwrap().require_open(),
            Err(TrexError::AlreadyExecuted { id: 0 })
        ));
    }

    #[test]
    fn terminal_errors() {
        let mut q = ExecutionQueue::default();
        let a = submit(&mut q);
        let b = submit(&mut q);
        q.mark_rejected(a);
        q.mark_expired(b);
        assert!(matches!(q.get(a).unwrap().require_open(), Err(TrexError::ExecutionRejected { .. })));
        assert!(matches!(q.get(b).unwrap().require_open(), Err(TrexError::ExecutionExpired { .. })));
        assert!(q.begin_dispatch(a).is_none());
        assert!(matches!(q.require(42), Err(TrexError::NotFound { .. })));
    }

    #[test]
    fn staleness_needs_ttl() {
        let mut q = ExecutionQueue::default();
        let id = submit(&mut q);
        assert!(q.stale(None, &t(10_000)).is_empty());
        assert!(q.stale(Some(60), &t(60)).is_empty());
        assert_eq!(q.stale(Some(60), &t(61)), vec![id]);
        q.mark_rejected(id);
        assert!(q.stale(Some(60), &t(61)).is_empty());
    }

    #[test]
    fn outcome_success_flag() {
        assert!(DispatchOutcome::Applied.is_success());
        assert!(!DispatchOutcome::Failed { reason: "x".into() }.is_success());
    }
}
