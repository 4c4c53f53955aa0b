//! Deferred close callback

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};
use xaproxy_core::{Resource, Synchronization, TransactionId, TransactionStatus};

/// Completion callback that physically closes one resource
///
/// Owns the resource from registration until it runs. Runs once, whatever the
/// outcome of the transaction. A failing close is logged and goes no further:
/// the outcome has already been decided.
pub struct DeferredClose<R: Resource> {
    resource: R,
    transaction: TransactionId,
    closed: Arc<AtomicBool>,
}

impl<R: Resource> DeferredClose<R> {
    /// Bind a resource; `closed` is set once the close has run
    pub fn new(resource: R, transaction: TransactionId, closed: Arc<AtomicBool>) -> Self {
        DeferredClose {
            resource,
            transaction,
            closed,
        }
    }

    /// Transaction the close was deferred in
    pub fn transaction(&self) -> TransactionId {
        self.transaction
    }
}

impl<R: Resource> Synchronization for DeferredClose<R> {
    fn after_completion(self: Box<Self>, status: TransactionStatus) {
        let DeferredClose {
            mut resource,
            transaction,
            closed,
        } = *self;
        let kind = resource.kind();
        match resource.close() {
            Ok(()) => trace!(%kind, txn = %transaction, %status, "Deferred close complete"),
            Err(e) => warn!(%kind, txn = %transaction, %status, error = %e, "Deferred close failed"),
        }
        closed.store(true, Ordering::Release);
    }
}

impl<R: Resource> fmt::Debug for DeferredClose<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredClose")
            .field("kind", &self.resource.kind())
            .field("transaction", &self.transaction)
            .finish()
    }
}
