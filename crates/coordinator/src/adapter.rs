//! Coordinator adapter over a [`TransactionManager`]
//!
//! Answers the proxies' four questions (is a transaction active, register a
//! completion callback, enlist, delist) and wraps every manager failure into
//! `Error::Coordination`, so the manager's own error type never reaches
//! proxy callers.

use crate::error::TransactionError;
use crate::transaction::{Transaction, TransactionManager};
use std::sync::Arc;
use tracing::trace;
use xaproxy_core::{
    DelistFlag, Error, Rejected, Result, Synchronization, TransactionCoordinator, TransactionId,
    XaResource,
};

/// [`TransactionCoordinator`] backed by a [`TransactionManager`]
#[derive(Debug, Clone)]
pub struct ManagedCoordinator<M> {
    manager: M,
}

impl<M: TransactionManager> ManagedCoordinator<M> {
    /// Wrap a transaction manager
    pub fn new(manager: M) -> Self {
        ManagedCoordinator { manager }
    }

    /// The wrapped manager
    pub fn manager(&self) -> &M {
        &self.manager
    }

    fn transaction(&self) -> Result<Option<Arc<dyn Transaction>>> {
        self.manager.transaction().map_err(wrap)
    }

    fn require_transaction(&self, operation: &str) -> Result<Arc<dyn Transaction>> {
        self.transaction()?.ok_or_else(|| {
            Error::coordination(format!("cannot {}: no transaction is active", operation))
        })
    }
}

fn wrap(e: TransactionError) -> Error {
    Error::coordination(e.to_string())
}

impl<M: TransactionManager> TransactionCoordinator for ManagedCoordinator<M> {
    fn current_transaction(&self) -> Result<Option<TransactionId>> {
        let id = self.transaction()?.map(|txn| txn.id());
        trace!(txn = ?id, "current_transaction");
        Ok(id)
    }

    fn register_completion(
        &self,
        callback: Box<dyn Synchronization>,
    ) -> std::result::Result<(), Rejected> {
        let txn = match self.require_transaction("register completion callback") {
            Ok(txn) => txn,
            Err(e) => return Err(Rejected::new(e, callback)),
        };
        trace!(txn = %txn.id(), "register_completion");
        txn.register_synchronization(callback)
            .map_err(|(e, callback)| Rejected::new(wrap(e), callback))
    }

    fn enlist(&self, handle: &Arc<dyn XaResource>) -> Result<()> {
        let txn = self.require_transaction("enlist resource")?;
        trace!(txn = %txn.id(), rm = handle.resource_manager_id(), "enlist");
        match txn.enlist_resource(Arc::clone(handle)) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::coordination("error enlisting resource")),
            Err(e) => Err(wrap(e)),
        }
    }

    fn delist(&self, handle: &Arc<dyn XaResource>, flag: DelistFlag) -> Result<()> {
        let txn = self.require_transaction("delist resource")?;
        trace!(txn = %txn.id(), rm = handle.resource_manager_id(), ?flag, "delist");
        match txn.delist_resource(handle, flag.as_xa_flags()) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::coordination("error delisting resource")),
            Err(e) => Err(wrap(e)),
        }
    }
}
