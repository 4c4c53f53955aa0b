//! Transaction manager surface
//!
//! A JTA-style view of the ambient transaction system: a manager that knows
//! the transaction associated with the calling thread, and transactions that
//! accept enlistments and completion callbacks. [`crate::ManagedCoordinator`]
//! adapts any implementation into the proxies' `TransactionCoordinator`.

use crate::error::{Result, TransactionError};
use std::sync::Arc;
use xaproxy_core::{Synchronization, TransactionId, TransactionStatus, XaFlags, XaResource};

/// Result of a synchronization registration; a refused callback is handed back.
pub type RegistrationResult =
    std::result::Result<(), (TransactionError, Box<dyn Synchronization>)>;

/// A transaction accepting enlistments and completion callbacks
pub trait Transaction: Send + Sync {
    /// Transaction id
    fn id(&self) -> TransactionId;

    /// Current status
    fn status(&self) -> TransactionStatus;

    /// Register a completion callback
    fn register_synchronization(&self, synchronization: Box<dyn Synchronization>)
        -> RegistrationResult;

    /// Associate a resource-manager handle with this transaction
    ///
    /// Returns `false` when the transaction declined the handle without a
    /// specific error.
    fn enlist_resource(&self, handle: Arc<dyn XaResource>) -> Result<bool>;

    /// End the association of a handle with this transaction
    ///
    /// Returns `false` when the handle was not associated.
    fn delist_resource(&self, handle: &Arc<dyn XaResource>, flags: XaFlags) -> Result<bool>;

    /// Force the outcome to rollback
    fn set_rollback_only(&self) -> Result<()>;
}

/// Demarcates transactions for the calling thread
pub trait TransactionManager: Send + Sync {
    /// Transaction associated with the calling thread, if any
    fn transaction(&self) -> Result<Option<Arc<dyn Transaction>>>;

    /// Begin a transaction and associate it with the calling thread
    fn begin(&self) -> Result<TransactionId>;

    /// Complete the calling thread's transaction, committing if possible
    ///
    /// Returns the final status. A commit that ends in rollback is reported
    /// as [`TransactionError::RolledBack`] after callbacks have run.
    fn commit(&self) -> Result<TransactionStatus>;

    /// Roll back the calling thread's transaction
    fn rollback(&self) -> Result<()>;

    /// Mark the calling thread's transaction rollback-only
    fn set_rollback_only(&self) -> Result<()> {
        match self.transaction()? {
            Some(txn) => txn.set_rollback_only(),
            None => Err(TransactionError::NoTransaction),
        }
    }

    /// Status of the calling thread's transaction
    fn status(&self) -> Result<Option<TransactionStatus>> {
        Ok(self.transaction()?.map(|txn| txn.status()))
    }
}

impl<T: TransactionManager + ?Sized> TransactionManager for Arc<T> {
    fn transaction(&self) -> Result<Option<Arc<dyn Transaction>>> {
        (**self).transaction()
    }

    fn begin(&self) -> Result<TransactionId> {
        (**self).begin()
    }

    fn commit(&self) -> Result<TransactionStatus> {
        (**self).commit()
    }

    fn rollback(&self) -> Result<()> {
        (**self).rollback()
    }

    fn set_rollback_only(&self) -> Result<()> {
        (**self).set_rollback_only()
    }

    fn status(&self) -> Result<Option<TransactionStatus>> {
        (**self).status()
    }
}
