//! Exactly-Once Close Property
//!
//! Random interleavings of creation, close, drop and transaction completion.
//! Whatever the order, once every transaction has finished and every handle
//! has been let go, each provider resource has been closed exactly once.

use crate::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Begin,
    Commit,
    Rollback,
    OpenContext,
    OpenSession,
    Close(usize),
    Drop(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Begin),
        1 => Just(Op::Commit),
        1 => Just(Op::Rollback),
        3 => Just(Op::OpenContext),
        3 => Just(Op::OpenSession),
        3 => any::<usize>().prop_map(Op::Close),
        2 => any::<usize>().prop_map(Op::Drop),
    ]
}

/// A resource under test; `proxied` is false for the provider's own
/// resources, which are not closed on drop
enum Held {
    Context { context: Box<dyn Context>, proxied: bool },
    Session { session: Box<dyn Session>, proxied: bool },
}

impl Held {
    fn close(&mut self) {
        let result = match self {
            Held::Context { context, .. } => context.close(),
            Held::Session { session, .. } => session.close(),
        };
        result.expect("close");
    }

    fn drops_cleanly(&self) -> bool {
        match self {
            Held::Context { proxied, .. } | Held::Session { proxied, .. } => *proxied,
        }
    }
}

fn run(ops: Vec<Op>, plain: bool) -> Harness {
    let h = if plain {
        harness_with(MemoryConnectionFactory::new, ProxyOptions::default())
    } else {
        harness()
    };
    let mut connection = h.factory.create_connection(Domain::Unified, None).unwrap();
    let mut held: Vec<Held> = Vec::new();

    for op in ops {
        let active = h.manager.current().is_some();
        match op {
            Op::Begin if !active => {
                h.begin();
            }
            Op::Commit if active => h.commit(),
            Op::Rollback if active => h.rollback(),
            Op::OpenContext => {
                // Contexts from an XA factory are always wrapped
                held.push(Held::Context {
                    context: h.factory.create_context(None, None).unwrap(),
                    proxied: active || !plain,
                });
            }
            Op::OpenSession => {
                let session = connection.create_session(SessionMode::AutoAcknowledge).unwrap();
                // A plain factory hands out a native connection, whose
                // sessions are native too
                held.push(Held::Session {
                    session,
                    proxied: active && !plain,
                });
            }
            Op::Close(i) if !held.is_empty() => {
                let mut resource = held.remove(i % held.len());
                resource.close();
            }
            Op::Drop(i) if !held.is_empty() => {
                let mut resource = held.remove(i % held.len());
                if !resource.drops_cleanly() {
                    resource.close();
                }
            }
            _ => {}
        }
    }

    if h.manager.current().is_some() {
        h.rollback();
    }
    for mut resource in held {
        resource.close();
    }
    connection.close().unwrap();
    h
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_every_resource_closes_exactly_once(ops in prop::collection::vec(op(), 0..40)) {
        let h = run(ops, false);
        for (id, count) in h.broker.journal().close_counts() {
            prop_assert_eq!(count, 1, "resource {} closed {} times", id, count);
        }
        prop_assert!(h.broker.journal().open_resources().is_empty());
    }

    #[test]
    fn prop_plain_factory_closes_exactly_once(ops in prop::collection::vec(op(), 0..40)) {
        let h = run(ops, true);
        for (id, count) in h.broker.journal().close_counts() {
            prop_assert_eq!(count, 1, "resource {} closed {} times", id, count);
        }
        prop_assert_eq!(h.manager.stats().active, 0);
    }
}
