//! Coordinator adapter surface
//!
//! The proxies never talk to a transaction manager directly. They go through
//! [`TransactionCoordinator`], an explicit handle passed in at construction
//! time, which answers "which transaction is active for this caller" and
//! accepts enlistments and completion callbacks.

use crate::error::{Error, Result};
use crate::xa::{DelistFlag, XaResource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Create a new random TransactionId using UUID v4
    pub fn new() -> Self {
        TransactionId(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        TransactionId(uuid)
    }

    /// Raw bytes, used as the XA global transaction id
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction status
///
/// ```text
/// Active ──► Preparing ──► Prepared ──► Committing ──► Committed
///   │            │
///   ▼            ▼
/// MarkedRollback ──► RollingBack ──► RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Accepting work
    Active,
    /// Still associated, but can only roll back
    MarkedRollback,
    /// Prepare phase in progress
    Preparing,
    /// All branches voted
    Prepared,
    /// Commit phase in progress
    Committing,
    /// Terminal: committed
    Committed,
    /// Rollback in progress
    RollingBack,
    /// Terminal: rolled back
    RolledBack,
    /// Outcome could not be determined
    Unknown,
}

impl TransactionStatus {
    /// Whether the transaction has reached a final outcome
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed | TransactionStatus::RolledBack | TransactionStatus::Unknown
        )
    }

    /// Whether new work (enlistments, callbacks) may still join the transaction
    pub fn accepts_work(&self) -> bool {
        matches!(self, TransactionStatus::Active)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Completion callback registered with a transaction
///
/// `after_completion` takes `self: Box<Self>`: a callback is consumed by its
/// invocation and cannot run twice.
pub trait Synchronization: Send {
    /// Called before the two-phase commit starts. Not called on rollback.
    fn before_completion(&mut self) {}

    /// Called once the outcome is final, with the final status
    fn after_completion(self: Box<Self>, status: TransactionStatus);
}

/// Adapts a closure into a [`Synchronization`]
pub struct CompletionFn<F>(F);

impl<F> Synchronization for CompletionFn<F>
where
    F: FnOnce(TransactionStatus) + Send,
{
    fn after_completion(self: Box<Self>, status: TransactionStatus) {
        (self.0)(status)
    }
}

/// Wrap a closure so it can be registered as a completion callback.
pub fn completion_fn<F>(f: F) -> CompletionFn<F>
where
    F: FnOnce(TransactionStatus) + Send,
{
    CompletionFn(f)
}

/// A refused completion-callback registration
///
/// The callback is handed back so whoever registered it keeps ownership of
/// anything it captured.
pub struct Rejected {
    /// Why the registration was refused
    pub error: Error,
    /// The callback that was not registered
    pub callback: Box<dyn Synchronization>,
}

impl Rejected {
    /// Pair a refusal with the callback it refused
    pub fn new(error: Error, callback: Box<dyn Synchronization>) -> Self {
        Self { error, callback }
    }

    /// Drop the callback and keep the error
    pub fn into_error(self) -> Error {
        self.error
    }
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Narrow interface over the ambient transaction system
///
/// Every failure is reported as [`Error::Coordination`]; implementations wrap
/// their own error types so nothing coordinator-specific leaks to callers.
/// No operation may begin a transaction as a side effect.
///
/// Implementations must be safe for concurrent use by independent callers on
/// independent transactions.
pub trait TransactionCoordinator: Send + Sync {
    /// The transaction active for the calling thread of execution, if any
    fn current_transaction(&self) -> Result<Option<TransactionId>>;

    /// Whether a transaction is active for the caller
    fn is_transaction_active(&self) -> Result<bool> {
        Ok(self.current_transaction()?.is_some())
    }

    /// Register a callback that runs once the current transaction completes
    ///
    /// Fails when no transaction is active, when it is marked rollback-only, or
    /// when the transaction system fails. The callback is returned on failure.
    fn register_completion(
        &self,
        callback: Box<dyn Synchronization>,
    ) -> std::result::Result<(), Rejected>;

    /// Enlist a resource-manager handle with the current transaction
    fn enlist(&self, handle: &Arc<dyn XaResource>) -> Result<()>;

    /// Delist a resource-manager handle from the current transaction
    fn delist(&self, handle: &Arc<dyn XaResource>, flag: DelistFlag) -> Result<()>;
}

impl<T: TransactionCoordinator + ?Sized> TransactionCoordinator for Arc<T> {
    fn current_transaction(&self) -> Result<Option<TransactionId>> {
        (**self).current_transaction()
    }

    fn is_transaction_active(&self) -> Result<bool> {
        (**self).is_transaction_active()
    }

    fn register_completion(
        &self,
        callback: Box<dyn Synchronization>,
    ) -> std::result::Result<(), Rejected> {
        (**self).register_completion(callback)
    }

    fn enlist(&self, handle: &Arc<dyn XaResource>) -> Result<()> {
        (**self).enlist(handle)
    }

    fn delist(&self, handle: &Arc<dyn XaResource>, flag: DelistFlag) -> Result<()> {
        (**self).delist(handle, flag)
    }
}
