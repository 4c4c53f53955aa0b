//! Transaction manager errors.
//!
//! These never reach proxy callers: [`crate::ManagedCoordinator`] turns them
//! into `xaproxy_core::Error::Coordination`.

use thiserror::Error;
use xaproxy_core::{TransactionId, TransactionStatus, XaError};

/// Errors raised by a [`crate::TransactionManager`] or [`crate::Transaction`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// No transaction is associated with the calling thread
    #[error("no transaction is associated with the current thread")]
    NoTransaction,

    /// `begin` called while a transaction is already associated
    #[error("transaction {0} is already associated with the current thread")]
    AlreadyAssociated(TransactionId),

    /// The transaction can only roll back
    #[error("transaction {0} is marked rollback-only")]
    RollbackOnly(TransactionId),

    /// Operation not allowed in the transaction's current status
    #[error("transaction {id} is {status}, operation not allowed")]
    IllegalState {
        /// Transaction id
        id: TransactionId,
        /// Status at the time of the call
        status: TransactionStatus,
    },

    /// The handle is already associated with the transaction
    #[error("resource manager {0} is already enlisted")]
    AlreadyEnlisted(String),

    /// The commit request ended in a rollback
    #[error("transaction {0} was rolled back")]
    RolledBack(TransactionId),

    /// A resource-manager handle failed
    #[error("resource manager failure: {0}")]
    Resource(#[from] XaError),

    /// The transaction system failed unexpectedly
    #[error("transaction system failure: {0}")]
    System(String),
}

/// Result type for transaction manager operations.
pub type Result<T> = std::result::Result<T, TransactionError>;
