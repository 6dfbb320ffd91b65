//! # Multi-Party Execution Approval
//!
//! Identities deployed through the directory with a 2-of-N approval policy:
//! self-targeted management calls, delegated external calls, rejection,
//! expiry, and single dispatch.

use std::sync::Arc;

use trex_core::{
    Address, Amount, IdentityPolicy, KeyId, KeyPurpose, KeyType, PurposeSet, Timestamp, TrexError,
};
use trex_identity::{
    DispatchOutcome, ExecutionStatus, IdentityCall, IdentityDirectory, RecordingDispatcher,
    SharedIdentity,
};

const K1: Address = Address([0x11; 20]);
const K2: Address = Address([0x12; 20]);
const K3: Address = Address([0x13; 20]);
const CLERK: Address = Address([0x14; 20]);
const OUTSIDER: Address = Address([0x15; 20]);
const VAULT: Address = Address([0x5a; 20]);

fn purposes(p: &[KeyPurpose]) -> PurposeSet {
    p.iter().copied().collect()
}

/// Identity managed by K1, K2, K3 (MANAGEMENT + ACTION) and a CLAIM-only
/// clerk, under a 2-approval policy.
fn setup(ttl: Option<u64>, dispatcher: Arc<RecordingDispatcher>) -> (IdentityDirectory, SharedIdentity) {
    let dir = IdentityDirectory::new(
        IdentityPolicy {
            approval_threshold: 2,
            pending_ttl_secs: ttl,
        },
        dispatcher,
    )
    .unwrap();
    let address = dir.deploy_identity(&K1).unwrap();
    let handle = dir.require(&address).unwrap();
    {
        let mut id = handle.write();
        id.add_key(&K1, KeyId::from_address(&K1), purposes(&[KeyPurpose::Action]), KeyType::Ecdsa)
            .unwrap();
        for k in [K2, K3] {
            id.add_key(
                &K1,
                KeyId::from_address(&k),
                purposes(&[KeyPurpose::Management, KeyPurpose::Action]),
                KeyType::Ecdsa,
            )
            .unwrap();
        }
        id.add_key(&K1, KeyId::from_address(&CLERK), purposes(&[KeyPurpose::Claim]), KeyType::Ecdsa)
            .unwrap();
    }
    (dir, handle)
}

fn add_key_call(key: Address) -> Vec<u8> {
    IdentityCall::AddKey {
        key: KeyId::from_address(&key),
        purposes: purposes(&[KeyPurpose::Action]),
        key_type: KeyType::Ecdsa,
    }
    .encode()
    .unwrap()
}

#[test]
fn self_call_dispatches_once_at_threshold() {
    let (_dir, handle) = setup(None, Arc::new(RecordingDispatcher::new()));
    let mut id = handle.write();
    let self_address = id.address();
    let new_key = Address([0x77; 20]);

    let ticket = id
        .execute(&K1, self_address, Amount::zero(), add_key_call(new_key))
        .unwrap();
    assert_eq!(ticket.status, ExecutionStatus::Approved);
    assert!(!id.key_has_purpose(&KeyId::from_address(&new_key), KeyPurpose::Action));

    // Same key again is a no-op without a receipt.
    let dup = id.approve(&K1, ticket.id, true).unwrap();
    assert_eq!(dup.status, ExecutionStatus::Approved);
    assert!(dup.receipt.is_none());

    let done = id.approve(&K2, ticket.id, true).unwrap();
    assert_eq!(done.status, ExecutionStatus::Executed);
    assert!(id.key_has_purpose(&KeyId::from_address(&new_key), KeyPurpose::Action));
    assert_eq!(
        id.get_execution(ticket.id).unwrap().outcome,
        Some(DispatchOutcome::Applied)
    );

    assert!(matches!(
        id.approve(&K3, ticket.id, true),
        Err(TrexError::AlreadyExecuted { .. })
    ));
}

#[test]
fn external_call_goes_to_dispatcher_exactly_once() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let (_dir, handle) = setup(None, Arc::clone(&dispatcher));
    let mut id = handle.write();

    let ticket = id
        .execute(&K2, VAULT, Amount::from(5u64), b"withdraw".to_vec())
        .unwrap();
    assert!(dispatcher.calls().is_empty());
    id.approve(&K3, ticket.id, true).unwrap();
    assert!(matches!(
        id.approve(&K1, ticket.id, true),
        Err(TrexError::AlreadyExecuted { .. })
    ));

    let calls = dispatcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].from, id.address());
    assert_eq!(calls[0].to, VAULT);
    assert_eq!(calls[0].value, Amount::from(5u64));
    assert_eq!(calls[0].data, b"withdraw".to_vec());
}

#[test]
fn failed_dispatch_still_consumes_the_execution() {
    let (_dir, handle) = setup(None, Arc::new(RecordingDispatcher::failing_on(VAULT)));
    let mut id = handle.write();
    let ticket = id.execute(&K1, VAULT, Amount::zero(), vec![]).unwrap();
    let done = id.approve(&K2, ticket.id, true).unwrap();
    assert_eq!(done.status, ExecutionStatus::Executed);
    assert!(matches!(
        id.get_execution(ticket.id).unwrap().outcome,
        Some(DispatchOutcome::Failed { .. })
    ));
}

#[test]
fn rejection_is_terminal_and_resubmission_gets_a_fresh_id() {
    let (_dir, handle) = setup(None, Arc::new(RecordingDispatcher::new()));
    let mut id = handle.write();
    let ticket = id.execute(&K1, VAULT, Amount::zero(), vec![1]).unwrap();
    let rejected = id.approve(&K2, ticket.id, false).unwrap();
    assert_eq!(rejected.status, ExecutionStatus::Rejected);
    assert!(matches!(
        id.approve(&K3, ticket.id, true),
        Err(TrexError::ExecutionRejected { .. })
    ));

    let again = id.execute(&K1, VAULT, Amount::zero(), vec![1]).unwrap();
    assert_ne!(again.id, ticket.id);
    assert_eq!(again.status, ExecutionStatus::Approved);
}

#[test]
fn approvals_require_the_call_purpose() {
    let (_dir, handle) = setup(None, Arc::new(RecordingDispatcher::new()));
    let mut id = handle.write();
    let self_address = id.address();

    assert!(matches!(
        id.execute(&OUTSIDER, VAULT, Amount::zero(), vec![]),
        Err(TrexError::Unauthorized { .. })
    ));

    // A CLAIM key may submit but its approval does not count.
    let ticket = id
        .execute(&CLERK, self_address, Amount::zero(), add_key_call(OUTSIDER))
        .unwrap();
    assert_eq!(ticket.status, ExecutionStatus::Pending);
    assert!(matches!(
        id.approve(&CLERK, ticket.id, true),
        Err(TrexError::Unauthorized { .. })
    ));
    assert!(matches!(
        id.approve(&K1, 999, true),
        Err(TrexError::NotFound { .. })
    ));
}

#[test]
fn stale_executions_expire() {
    let (dir, handle) = setup(Some(60), Arc::new(RecordingDispatcher::new()));
    let t0 = Timestamp::from_epoch_secs(1_900_000_000).unwrap();
    let late = Timestamp::from_epoch_secs(1_900_000_061).unwrap();

    let (first, second) = {
        let mut id = handle.write();
        let a = id.execute_at(&K1, VAULT, Amount::zero(), vec![], t0).unwrap();
        let b = id.execute_at(&K1, VAULT, Amount::zero(), vec![2], t0).unwrap();
        (a.id, b.id)
    };

    // A late approval is refused and leaves the execution as it was.
    assert!(matches!(
        handle.write().approve_at(&K2, first, true, late),
        Err(TrexError::ExecutionExpired { .. })
    ));
    assert_eq!(
        handle.read().get_execution(first).unwrap().status,
        ExecutionStatus::Approved
    );

    let address = handle.read().address();
    assert_eq!(
        dir.expire_pending(late),
        vec![(address, first), (address, second)]
    );
    assert_eq!(
        handle.read().get_execution(first).unwrap().status,
        ExecutionStatus::Expired
    );
    assert!(dir.expire_pending(late).is_empty());
}

#[test]
fn revoked_approver_no_longer_counts_toward_threshold() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let (_dir, handle) = setup(None, Arc::clone(&dispatcher));
    let mut id = handle.write();

    let ticket = id.execute(&K2, VAULT, Amount::zero(), b"sweep".to_vec()).unwrap();
    assert_eq!(ticket.status, ExecutionStatus::Approved);

    // K2 is compromised: K1 strips both of its purposes.
    let k2 = KeyId::from_address(&K2);
    id.remove_key(&K1, &k2, KeyPurpose::Action).unwrap();
    id.remove_key(&K1, &k2, KeyPurpose::Management).unwrap();
    assert!(id.get_key(&k2).is_none());

    let partial = id.approve(&K3, ticket.id, true).unwrap();
    assert_eq!(partial.status, ExecutionStatus::Approved);
    assert!(dispatcher.calls().is_empty());

    let done = id.approve(&K1, ticket.id, true).unwrap();
    assert_eq!(done.status, ExecutionStatus::Executed);
    assert_eq!(dispatcher.calls().len(), 1);
}
