//! Reference transaction manager
//!
//! Associates at most one transaction with each thread and completes it on
//! `commit`/`rollback`.
//!
//! ## Completion Sequence
//!
//! ```text
//! 1. before_completion() on every callback (commit only)
//! 2. Drive enlisted branches to Committed or RolledBack
//! 3. Disassociate the transaction from the calling thread
//! 4. after_completion(status) on every callback
//! 5. Return the final status
//! ```
//!
//! Callbacks therefore observe "no transaction active" on the completing
//! thread, and a callback that closes a resource cannot be mistaken for
//! in-transaction work.

use crate::adapter::ManagedCoordinator;
use crate::error::{Result, TransactionError};
use crate::local::LocalTransaction;
use crate::transaction::{Transaction, TransactionManager};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use xaproxy_core::{TransactionId, TransactionStatus};

/// Counters describing the manager's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerStats {
    /// Transactions begun
    pub begun: u64,
    /// Transactions that reached Committed
    pub committed: u64,
    /// Transactions that reached RolledBack
    pub rolled_back: u64,
    /// Transactions currently associated with a thread
    pub active: usize,
}

/// In-memory transaction manager with one transaction per thread
///
/// # Thread Safety
///
/// Independent threads run independent transactions. The association map is
/// only locked for lookups and updates; completion work and callbacks run
/// without it.
pub struct LocalTransactionManager {
    associations: Mutex<HashMap<ThreadId, Arc<LocalTransaction>>>,
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

impl LocalTransactionManager {
    /// Create a manager with no active transactions
    pub fn new() -> Self {
        LocalTransactionManager {
            associations: Mutex::new(HashMap::new()),
            begun: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            rolled_back: AtomicU64::new(0),
        }
    }

    /// Coordinator adapter over this manager, ready to hand to the proxies
    pub fn coordinator(self: &Arc<Self>) -> ManagedCoordinator<Arc<Self>> {
        ManagedCoordinator::new(Arc::clone(self))
    }

    /// Transaction associated with the calling thread
    pub fn current(&self) -> Option<Arc<LocalTransaction>> {
        self.associations
            .lock()
            .get(&thread::current().id())
            .cloned()
    }

    /// Snapshot of the manager's counters
    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            begun: self.begun.load(Ordering::SeqCst),
            committed: self.committed.load(Ordering::SeqCst),
            rolled_back: self.rolled_back.load(Ordering::SeqCst),
            active: self.associations.lock().len(),
        }
    }

    fn complete(&self, commit: bool) -> Result<(TransactionId, TransactionStatus)> {
        let txn = self.current().ok_or(TransactionError::NoTransaction)?;

        if commit {
            txn.before_completion();
        }
        let status = txn.complete(commit);

        self.associations.lock().remove(&thread::current().id());

        match status {
            TransactionStatus::Committed => self.committed.fetch_add(1, Ordering::SeqCst),
            _ => self.rolled_back.fetch_add(1, Ordering::SeqCst),
        };
        tracing::debug!(txn = %txn.id(), %status, "Transaction completed");

        txn.after_completion(status);
        Ok((txn.id(), status))
    }
}

impl Default for LocalTransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager for LocalTransactionManager {
    fn transaction(&self) -> Result<Option<Arc<dyn Transaction>>> {
        Ok(self.current().map(|txn| txn as Arc<dyn Transaction>))
    }

    fn begin(&self) -> Result<TransactionId> {
        let mut associations = self.associations.lock();
        let thread_id = thread::current().id();
        if let Some(existing) = associations.get(&thread_id) {
            return Err(TransactionError::AlreadyAssociated(existing.id()));
        }
        let txn = Arc::new(LocalTransaction::new());
        let id = txn.id();
        associations.insert(thread_id, txn);
        self.begun.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(txn = %id, "Transaction begun");
        Ok(id)
    }

    fn commit(&self) -> Result<TransactionStatus> {
        match self.complete(true)? {
            (_, TransactionStatus::Committed) => Ok(TransactionStatus::Committed),
            (id, _) => Err(TransactionError::RolledBack(id)),
        }
    }

    fn rollback(&self) -> Result<()> {
        self.complete(false).map(|_| ())
    }
}
