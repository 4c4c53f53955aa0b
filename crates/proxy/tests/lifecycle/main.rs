//! Proxy Lifecycle Integration Tests
//!
//! Drives `ConnectionFactoryProxy` against the reference transaction manager
//! and the in-memory provider, checking every physical close in the broker
//! journal.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p xaproxy-proxy --test lifecycle
//! cargo test -p xaproxy-proxy --test lifecycle closing::
//! ```

use std::sync::Arc;

use xaproxy_coordinator::{LocalTransactionManager, TransactionManager};
use xaproxy_core::{ProxyOptions, ResourceKind};
use xaproxy_memory::{Broker, MemoryConnectionFactory};
use xaproxy_proxy::ConnectionFactoryProxy;

mod creation;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Manager, broker and proxy factory wired together
pub struct Fixture {
    pub manager: Arc<LocalTransactionManager>,
    pub broker: Broker,
    pub factory: ConnectionFactoryProxy,
}

impl Fixture {
    pub fn begin(&self) {
        self.manager.begin().expect("begin");
    }

    pub fn commit(&self) {
        self.manager.commit().expect("commit");
    }

    pub fn rollback(&self) {
        self.manager.rollback().expect("rollback");
    }

    pub fn closes(&self, kind: ResourceKind) -> usize {
        self.broker.journal().closes_of(kind)
    }

    pub fn creations(&self, kind: ResourceKind) -> usize {
        self.broker.journal().creations_of(kind)
    }

    /// Branches enlisted in the calling thread's transaction
    pub fn branches(&self) -> usize {
        self.manager
            .current()
            .map(|txn| txn.branch_count())
            .unwrap_or(0)
    }
}

/// Proxy over an XA-capable memory factory with default options
pub fn xa_fixture() -> Fixture {
    fixture_with(MemoryConnectionFactory::xa, ProxyOptions::default())
}

/// Proxy over a plain memory factory with default options
pub fn plain_fixture() -> Fixture {
    fixture_with(MemoryConnectionFactory::new, ProxyOptions::default())
}

pub fn fixture_with(
    make: impl FnOnce(Broker) -> MemoryConnectionFactory,
    options: ProxyOptions,
) -> Fixture {
    let manager = Arc::new(LocalTransactionManager::new());
    let broker = Broker::new("lifecycle");
    let factory = ConnectionFactoryProxy::with_options(
        Arc::new(make(broker.clone())),
        Arc::new(manager.coordinator()),
        options,
    );
    Fixture {
        manager,
        broker,
        factory,
    }
}
