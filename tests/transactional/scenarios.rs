//! Reference Scenarios
//!
//! The three canonical sequences: close inside a transaction, close outside
//! one, and a failed enlistment.

use crate::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use xaproxy::api::completion_fn;

// =============================================================================
// CLOSE INSIDE A TRANSACTION
// =============================================================================

#[test]
fn test_session_close_delists_before_registering() {
    let h = harness();
    h.begin();

    let mut connection = h.factory.create_connection(Domain::Unified, None).unwrap();
    let mut session = connection.create_session(SessionMode::AutoAcknowledge).unwrap();
    h.coordinator.clear();

    session.close().unwrap();
    assert_eq!(
        h.coordinator.calls(),
        vec!["current", "delist:success", "register"]
    );
}

#[test]
fn test_session_physically_closes_after_terminal_state() {
    let h = harness();
    h.begin();

    let mut connection = h.factory.create_connection(Domain::Unified, None).unwrap();
    let mut session = connection.create_session(SessionMode::AutoAcknowledge).unwrap();

    // Registered first, so it runs before the deferred close
    let seen = Arc::new(AtomicUsize::new(usize::MAX));
    let status_seen = Arc::new(Mutex::new(None));
    let (probe, status_probe) = (Arc::clone(&seen), Arc::clone(&status_seen));
    let broker = h.broker.clone();
    h.coordinator
        .register_completion(Box::new(completion_fn(move |status| {
            *status_probe.lock() = Some(status);
            probe.store(broker.journal().closes_of(ResourceKind::Session), Ordering::SeqCst);
        })))
        .unwrap();

    session.close().unwrap();
    assert_eq!(h.closes(ResourceKind::Session), 0);

    h.commit();
    assert_eq!(*status_seen.lock(), Some(TransactionStatus::Committed));
    assert_eq!(seen.load(Ordering::SeqCst), 0);
    assert_eq!(h.closes(ResourceKind::Session), 1);

    connection.close().unwrap();
    assert_eq!(h.closes(ResourceKind::Connection), 1);
}

// =============================================================================
// CLOSE OUTSIDE A TRANSACTION
// =============================================================================

#[test]
fn test_connection_close_without_transaction_is_synchronous() {
    let h = harness();

    let mut connection = h.factory.create_connection(Domain::Unified, None).unwrap();
    h.coordinator.clear();

    connection.close().unwrap();
    assert_eq!(h.closes(ResourceKind::Connection), 1);
    assert!(h.coordinator.calls().is_empty());
}

// =============================================================================
// FAILED ENLISTMENT
// =============================================================================

#[test]
fn test_enlist_failure_fails_creation_and_closes_the_resource() {
    let h = harness();
    let mut connection = h.factory.create_connection(Domain::Unified, None).unwrap();
    h.begin();
    h.broker.fail_xa_start(true);

    let err = connection
        .create_session(SessionMode::AutoAcknowledge)
        .err()
        .unwrap();
    assert!(err.is_coordination());
    assert!(err.to_string().contains("coordination failure"));
    assert_eq!(h.broker.journal().creations_of(ResourceKind::Session), 1);
    assert_eq!(h.closes(ResourceKind::Session), 1);

    h.broker.fail_xa_start(false);
    h.rollback();
    connection.close().unwrap();
    h.assert_closed_exactly_once();
}

// =============================================================================
// TRANSACTION SWITCH BEFORE CLOSE
// =============================================================================

#[test]
fn test_resource_outliving_its_transaction_never_joins_the_next_one() {
    let h = harness();
    let mut connection = h.factory.create_connection(Domain::Unified, None).unwrap();

    let first = h.begin();
    let mut session = connection.create_session(SessionMode::AutoAcknowledge).unwrap();
    h.commit();

    let second = h.begin();
    assert_ne!(first, second);
    h.coordinator.clear();

    session.close().unwrap();
    assert_eq!(h.coordinator.calls(), vec!["current"]);
    assert_eq!(h.closes(ResourceKind::Session), 1);
    assert_eq!(h.manager.current().unwrap().branch_count(), 0);

    h.commit();
    connection.close().unwrap();
    h.assert_closed_exactly_once();
}
