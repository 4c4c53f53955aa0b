//! Concurrency Tests
//!
//! One factory proxy shared by many threads, each running its own
//! transactions.

use crate::*;
use std::thread;

const THREADS: usize = 8;
const ROUNDS: usize = 25;

#[test]
fn test_threads_run_independent_transactions() {
    let h = harness();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let h = &h;
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    h.begin();
                    let mut context = h.factory.create_context(None, None).unwrap();
                    let mut producer = context.create_producer().unwrap();
                    producer
                        .send(
                            Some(&Destination::queue("work")),
                            Message::text(format!("{}-{}", t, round)),
                        )
                        .unwrap();
                    context.close().unwrap();

                    if round % 2 == 0 {
                        h.commit();
                    } else {
                        h.rollback();
                    }
                }
            });
        }
    });

    let committed = THREADS * ((ROUNDS + 1) / 2);
    assert_eq!(h.broker.queue_depth("work"), committed);
    assert_eq!(h.manager.stats().committed as usize, committed);
    assert_eq!(h.manager.stats().active, 0);
    assert_eq!(
        h.broker.journal().creations_of(ResourceKind::Context),
        THREADS * ROUNDS
    );
    h.assert_closed_exactly_once();
}

#[test]
fn test_transaction_on_one_thread_is_invisible_to_another() {
    let h = harness();
    h.begin();

    thread::scope(|scope| {
        scope.spawn(|| {
            let mut context = h.factory.create_context(None, None).unwrap();
            assert!(context.xa_resource().is_none());
            context.close().unwrap();
            assert_eq!(h.closes(ResourceKind::Context), 1);
        });
    });

    let mut context = h.factory.create_context(None, None).unwrap();
    assert!(context.xa_resource().is_some());
    context.close().unwrap();
    assert_eq!(h.closes(ResourceKind::Context), 1);

    h.commit();
    assert_eq!(h.closes(ResourceKind::Context), 2);
}

#[test]
fn test_resources_can_move_between_threads() {
    let h = harness();
    let mut connection = h.factory.create_connection(Domain::Unified, None).unwrap();
    let session = connection.create_session(SessionMode::AutoAcknowledge).unwrap();

    let mut session = thread::spawn(move || {
        let mut session = session;
        session
            .create_producer(Some(&Destination::queue("q")))
            .unwrap()
            .send(None, Message::text("from worker"))
            .unwrap();
        session
    })
    .join()
    .unwrap();

    assert_eq!(h.queued("q"), vec!["from worker"]);
    session.close().unwrap();
    connection.close().unwrap();
    h.assert_closed_exactly_once();
}
