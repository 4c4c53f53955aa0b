//! Creation Decision Tests
//!
//! What the proxy factory hands out, depending on the factory's capabilities
//! and on whether a transaction is active.

use crate::*;
use xaproxy_core::{
    Capability, ConnectionFactory, Domain, Error, SessionMode, XaConnectionFactory,
};

// =============================================================================
// NO ACTIVE TRANSACTION
// =============================================================================

#[test]
fn test_plain_factory_outside_transaction_is_pass_through() {
    let fx = plain_fixture();

    let mut connection = fx.factory.create_connection(Domain::Unified, None).unwrap();
    assert!(connection.as_xa_mut().is_none());
    let mut session = connection.create_session(SessionMode::AutoAcknowledge).unwrap();
    assert!(session.xa_resource().is_none());

    session.close().unwrap();
    connection.close().unwrap();
    assert_eq!(fx.closes(ResourceKind::Session), 1);
    assert_eq!(fx.closes(ResourceKind::Connection), 1);
}

#[test]
fn test_xa_factory_outside_transaction_hands_out_xa_connection() {
    let fx = xa_fixture();

    let mut connection = fx.factory.create_connection(Domain::Unified, None).unwrap();
    assert!(connection.as_xa_mut().is_some());

    // Plain sessions from an XA connection stay native outside a transaction
    let session = connection.create_session(SessionMode::Transacted).unwrap();
    assert!(session.xa_resource().is_none());
    assert!(session.is_transacted().unwrap());
}

#[test]
fn test_xa_factory_outside_transaction_gives_plain_context() {
    let fx = xa_fixture();

    let mut context = fx
        .factory
        .create_context(None, Some(SessionMode::DupsOkAcknowledge))
        .unwrap();
    assert!(context.xa_resource().is_none());
    assert_eq!(context.mode().unwrap(), SessionMode::DupsOkAcknowledge);
    context.close().unwrap();
    assert_eq!(fx.closes(ResourceKind::Context), 1);
}

#[test]
fn test_explicit_xa_context_outside_transaction_is_not_enlisted() {
    let fx = xa_fixture();

    let mut context = fx.factory.create_xa_context(None).unwrap();
    assert!(context.xa_resource().is_some());
    assert_eq!(fx.manager.stats().begun, 0);
    context.close().unwrap();
    assert_eq!(fx.closes(ResourceKind::Context), 1);
}

// =============================================================================
// ACTIVE TRANSACTION
// =============================================================================

#[test]
fn test_context_in_transaction_becomes_a_branch() {
    let fx = xa_fixture();
    fx.begin();

    let context = fx.factory.create_context(None, None).unwrap();
    assert!(context.xa_resource().is_some());
    assert_eq!(fx.branches(), 1);

    drop(context);
    fx.commit();
    assert_eq!(fx.closes(ResourceKind::Context), 1);
}

#[test]
fn test_connection_in_transaction_is_not_a_branch() {
    let fx = xa_fixture();
    fx.begin();

    let mut connection = fx.factory.create_connection(Domain::Unified, None).unwrap();
    assert_eq!(fx.branches(), 0);

    let session = connection.create_session(SessionMode::AutoAcknowledge).unwrap();
    assert!(session.xa_resource().is_some());
    assert_eq!(fx.branches(), 1);

    let xa_session = connection.as_xa_mut().unwrap().create_xa_session().unwrap();
    assert!(xa_session.xa_resource().is_some());
    assert_eq!(fx.branches(), 2);
    fx.rollback();
}

#[test]
fn test_plain_factory_in_transaction_defers_without_enlisting() {
    let fx = plain_fixture();
    fx.begin();

    let mut connection = fx.factory.create_connection(Domain::Unified, None).unwrap();
    let mut session = connection.create_session(SessionMode::Transacted).unwrap();
    assert!(session.xa_resource().is_none());
    assert_eq!(fx.branches(), 0);

    session.close().unwrap();
    connection.close().unwrap();
    assert_eq!(fx.closes(ResourceKind::Session), 0);
    assert_eq!(fx.closes(ResourceKind::Connection), 0);

    fx.commit();
    assert_eq!(fx.closes(ResourceKind::Session), 1);
    assert_eq!(fx.closes(ResourceKind::Connection), 1);
}

#[test]
fn test_connection_from_before_the_transaction_enlists_new_sessions() {
    let fx = xa_fixture();
    let mut connection = fx.factory.create_connection(Domain::Unified, None).unwrap();

    let native = connection.create_session(SessionMode::AutoAcknowledge).unwrap();
    assert!(native.xa_resource().is_none());

    fx.begin();
    let mut managed = connection.create_session(SessionMode::AutoAcknowledge).unwrap();
    assert!(managed.xa_resource().is_some());
    assert_eq!(fx.branches(), 1);

    managed.close().unwrap();
    assert_eq!(fx.closes(ResourceKind::Session), 0);
    fx.rollback();
    assert_eq!(fx.closes(ResourceKind::Session), 1);
}

// =============================================================================
// FAILURES
// =============================================================================

#[test]
fn test_enlist_failure_closes_the_new_context() {
    let fx = xa_fixture();
    fx.broker.fail_xa_start(true);
    fx.begin();

    let err = fx.factory.create_context(None, None).err().unwrap();
    assert!(err.is_coordination());
    assert_eq!(fx.creations(ResourceKind::Context), 1);
    assert_eq!(fx.closes(ResourceKind::Context), 1);
    assert!(fx.broker.journal().open_resources().is_empty());
    fx.rollback();
}

#[test]
fn test_rollback_only_transaction_refuses_new_branches() {
    let fx = xa_fixture();
    let mut connection = fx.factory.create_connection(Domain::Unified, None).unwrap();
    fx.begin();
    fx.manager.set_rollback_only().unwrap();

    let err = connection.create_session(SessionMode::AutoAcknowledge).err().unwrap();
    assert!(err.is_coordination());
    assert_eq!(fx.closes(ResourceKind::Session), 1);
    fx.rollback();
}

#[test]
fn test_explicit_xa_requests_on_plain_factory() {
    let fx = plain_fixture();
    fx.begin();

    let err = fx.factory.create_xa_connection(Domain::Unified, None).err().unwrap();
    assert!(matches!(err, Error::CapabilityMismatch(Capability::XaConnectionFactory)));
    let err = fx.factory.create_xa_context(None).err().unwrap();
    assert!(matches!(err, Error::CapabilityMismatch(Capability::XaConnectionFactory)));
    assert!(fx.broker.journal().entries().is_empty());
}

#[test]
fn test_unsupported_domain() {
    let fx = xa_fixture();
    let err = fx.factory.create_connection(Domain::Topic, None).err().unwrap();
    assert!(matches!(err, Error::CapabilityMismatch(Capability::TopicDomain)));
    assert!(fx.broker.journal().entries().is_empty());
}
