//! End-to-End Messaging Tests
//!
//! Messages sent through enlisted resources become visible only when the
//! transaction commits.

use crate::*;
use std::time::Duration;

fn send(context: &mut Box<dyn Context>, queue: &str, text: &str) {
    let mut producer = context.create_producer().unwrap();
    producer
        .send(Some(&Destination::queue(queue)), Message::text(text))
        .unwrap();
}

// =============================================================================
// SINGLE BRANCH
// =============================================================================

#[test]
fn test_commit_delivers() {
    let h = harness();
    h.begin();

    let mut context = h.factory.create_context(None, None).unwrap();
    send(&mut context, "orders", "order-1");
    context.close().unwrap();
    assert!(h.queued("orders").is_empty());

    h.commit();
    assert_eq!(h.queued("orders"), vec!["order-1"]);
    h.assert_closed_exactly_once();
}

#[test]
fn test_rollback_discards() {
    let h = harness();
    h.begin();

    let mut context = h.factory.create_context(None, None).unwrap();
    send(&mut context, "orders", "order-1");
    context.close().unwrap();

    h.rollback();
    assert!(h.queued("orders").is_empty());
    h.assert_closed_exactly_once();
}

#[test]
fn test_sends_outside_transaction_are_immediate() {
    let h = harness();

    let mut context = h.factory.create_context(None, None).unwrap();
    send(&mut context, "orders", "now");
    assert_eq!(h.queued("orders"), vec!["now"]);
    context.close().unwrap();
}

// =============================================================================
// TWO-PHASE COMMIT
// =============================================================================

#[test]
fn test_two_sessions_commit_together() {
    let h = harness();
    let mut connection = h.factory.create_connection(Domain::Unified, None).unwrap();
    h.begin();

    let mut orders = connection.create_session(SessionMode::AutoAcknowledge).unwrap();
    let mut audit = connection.create_session(SessionMode::AutoAcknowledge).unwrap();
    orders
        .create_producer(Some(&Destination::queue("orders")))
        .unwrap()
        .send(None, Message::text("order-1"))
        .unwrap();
    audit
        .create_producer(Some(&Destination::topic("audit")))
        .unwrap()
        .send(None, Message::text("order-1 placed"))
        .unwrap();
    assert_eq!(h.manager.current().unwrap().branch_count(), 2);

    orders.close().unwrap();
    audit.close().unwrap();
    h.commit();

    assert_eq!(h.queued("orders"), vec!["order-1"]);
    assert_eq!(h.broker.topic_len("audit"), 1);
    connection.close().unwrap();
    h.assert_closed_exactly_once();
}

#[test]
fn test_prepare_failure_rolls_back_every_branch() {
    let h = harness();
    h.begin();

    let mut first = h.factory.create_context(None, None).unwrap();
    let mut second = h.factory.create_context(None, None).unwrap();
    send(&mut first, "orders", "a");
    send(&mut second, "orders", "b");
    first.close().unwrap();
    second.close().unwrap();

    h.broker.fail_xa_prepare(true);
    assert!(h.manager.commit().is_err());
    assert!(h.queued("orders").is_empty());
    assert_eq!(h.manager.stats().rolled_back, 1);
    h.assert_closed_exactly_once();
}

// =============================================================================
// CONSUMING
// =============================================================================

#[test]
fn test_subscriber_sees_committed_publication() {
    let h = harness();
    let mut listener = h.factory.create_context(None, None).unwrap();
    let topic = listener.create_topic("prices").unwrap();
    let mut consumer = listener.create_consumer(&topic, None).unwrap();

    h.begin();
    let mut publisher = h.factory.create_context(None, None).unwrap();
    publisher
        .create_producer()
        .unwrap()
        .send(Some(&topic), Message::text("42.0"))
        .unwrap();
    publisher.close().unwrap();
    assert!(consumer.receive_no_wait().unwrap().is_none());

    h.commit();
    let received = consumer.receive(Duration::from_millis(100)).unwrap().unwrap();
    assert_eq!(received.as_text(), Some("42.0"));
    assert_eq!(received.destination, Some(topic));

    consumer.close().unwrap();
    listener.close().unwrap();
    h.assert_closed_exactly_once();
}

#[test]
fn test_selector_passes_through_the_proxy() {
    let h = harness();
    let mut context = h.factory.create_context(None, None).unwrap();
    let queue = context.create_queue("orders").unwrap();
    let mut producer = context.create_producer().unwrap();
    producer
        .send(Some(&queue), Message::text("x").with_property("region", "eu"))
        .unwrap();
    producer
        .send(Some(&queue), Message::text("y").with_property("region", "us"))
        .unwrap();

    let mut consumer = context.create_consumer(&queue, Some("region = 'us'")).unwrap();
    assert_eq!(consumer.receive_no_wait().unwrap().unwrap().as_text(), Some("y"));

    // Provider errors arrive untouched
    let err = context.create_consumer(&queue, Some("region <> 'us'")).err().unwrap();
    assert_eq!(
        err.as_provider().and_then(|e| e.code.as_deref()),
        Some("INVALID_SELECTOR")
    );
}
