//! Lifecycle state machine shared by every resource proxy
//!
//! ```text
//!            close, no transaction / other transaction
//!   Open ─────────────────────────────────────────────► Closed
//!     │                                                   ▲
//!     │ close, creation transaction active                │ deferred close ran
//!     └──────────────────► ClosePending ──────────────────┘
//! ```
//!
//! A delist failure leaves the proxy `Open`. Nothing leaves `Closed`.

use crate::deferred::DeferredClose;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use xaproxy_core::{
    Error, ProxyOptions, Resource, ResourceKind, Result, TransactionCoordinator, TransactionId,
    TransactionStatus, XaResource,
};

/// Observable state of a resource proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// The wrapped resource is usable
    Open,
    /// Close was requested inside a transaction; the physical close runs on completion
    ClosePending,
    /// The wrapped resource has been physically closed (terminal)
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Open => "open",
            LifecycleState::ClosePending => "close pending",
            LifecycleState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// How a proxied resource relates to the transaction system
#[derive(Debug, Clone)]
pub(crate) enum Enlistment {
    /// Created with no transaction active: close is always immediate
    Unmanaged,
    /// Created inside `transaction`, with its handle enlisted if it has one
    Managed {
        transaction: TransactionId,
        handle: Option<Arc<dyn XaResource>>,
    },
}

impl Enlistment {
    pub(crate) fn managed(transaction: TransactionId, handle: Option<Arc<dyn XaResource>>) -> Self {
        Enlistment::Managed {
            transaction,
            handle,
        }
    }
}

/// Collaborators shared by a factory proxy and everything it creates
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) coordinator: Arc<dyn TransactionCoordinator>,
    pub(crate) options: Arc<ProxyOptions>,
}

impl Binding {
    pub(crate) fn new(coordinator: Arc<dyn TransactionCoordinator>, options: ProxyOptions) -> Self {
        Binding {
            coordinator,
            options: Arc::new(options),
        }
    }

    pub(crate) fn current_transaction(&self) -> Result<Option<TransactionId>> {
        self.coordinator.current_transaction()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// One wrapped resource plus its close state
pub(crate) struct Lifecycle<R: Resource + 'static> {
    kind: ResourceKind,
    resource: Option<R>,
    enlistment: Enlistment,
    binding: Binding,
    state: LifecycleState,
    /// Set by the deferred close once the physical close has run
    completed: Arc<AtomicBool>,
}

impl<R: Resource + 'static> Lifecycle<R> {
    pub(crate) fn new(resource: R, enlistment: Enlistment, binding: Binding) -> Self {
        let kind = resource.kind();
        trace!(%kind, ?enlistment, "Wrapping resource");
        Lifecycle {
            kind,
            resource: Some(resource),
            enlistment,
            binding,
            state: LifecycleState::Open,
            completed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        match self.state {
            LifecycleState::ClosePending if self.completed.load(Ordering::Acquire) => {
                LifecycleState::Closed
            }
            state => state,
        }
    }

    pub(crate) fn binding(&self) -> &Binding {
        &self.binding
    }

    pub(crate) fn enlisted_in(&self) -> Option<TransactionId> {
        match &self.enlistment {
            Enlistment::Managed { transaction, .. } => Some(*transaction),
            Enlistment::Unmanaged => None,
        }
    }

    pub(crate) fn handle(&self) -> Option<&Arc<dyn XaResource>> {
        match &self.enlistment {
            Enlistment::Managed { handle, .. } => handle.as_ref(),
            Enlistment::Unmanaged => None,
        }
    }

    fn not_open(&self) -> Error {
        Error::IllegalState(format!("{} is {}", self.kind, self.state()))
    }

    /// The wrapped resource, while the proxy is open
    pub(crate) fn resource(&self) -> Result<&R> {
        match self.resource.as_ref() {
            Some(resource) if self.state == LifecycleState::Open => Ok(resource),
            _ => Err(self.not_open()),
        }
    }

    pub(crate) fn resource_mut(&mut self) -> Result<&mut R> {
        if self.state != LifecycleState::Open {
            return Err(self.not_open());
        }
        let kind = self.kind;
        self.resource
            .as_mut()
            .ok_or_else(|| Error::IllegalState(format!("{} has no resource", kind)))
    }

    /// Close the wrapped resource now, or hand it to a deferred close
    ///
    /// Repeated calls after the first successful one return `Ok(())`.
    pub(crate) fn close(&mut self) -> Result<()> {
        if self.state != LifecycleState::Open {
            trace!(kind = %self.kind, state = %self.state(), "Close on a proxy that is not open");
            return Ok(());
        }

        let (transaction, handle) = match &self.enlistment {
            Enlistment::Unmanaged => return self.close_now(),
            Enlistment::Managed {
                transaction,
                handle,
            } => (*transaction, handle.clone()),
        };

        let current = self.binding.current_transaction()?;
        if current != Some(transaction) {
            if let Some(other) = current {
                debug!(kind = %self.kind, created_in = %transaction, current = %other,
                    "Creation transaction has completed, closing immediately");
            }
            return self.close_now();
        }

        if let Some(handle) = &handle {
            self.binding
                .coordinator
                .delist(handle, self.binding.options.delist_flag)?;
        }

        let Some(resource) = self.resource.take() else {
            self.state = LifecycleState::Closed;
            return Ok(());
        };
        let callback = DeferredClose::new(resource, transaction, Arc::clone(&self.completed));
        match self.binding.coordinator.register_completion(Box::new(callback)) {
            Ok(()) => {
                debug!(kind = %self.kind, txn = %transaction, "Close deferred to transaction completion");
                self.state = LifecycleState::ClosePending;
                Ok(())
            }
            Err(rejected) => {
                // Already delisted: close now rather than leak the resource
                warn!(kind = %self.kind, txn = %transaction, error = %rejected.error,
                    "Deferred close refused, closing immediately");
                self.state = LifecycleState::Closed;
                let error = rejected.error;
                rejected.callback.after_completion(TransactionStatus::Unknown);
                Err(error)
            }
        }
    }

    fn close_now(&mut self) -> Result<()> {
        self.state = LifecycleState::Closed;
        let Some(mut resource) = self.resource.take() else {
            return Ok(());
        };
        match resource.close() {
            Ok(()) => {
                trace!(kind = %self.kind, "Closed resource");
                Ok(())
            }
            Err(e) => {
                warn!(kind = %self.kind, error = %e, "Failed to close resource");
                Err(Error::resource_close(self.kind, e))
            }
        }
    }
}

impl<R: Resource + 'static> Drop for Lifecycle<R> {
    fn drop(&mut self) {
        if self.state != LifecycleState::Open {
            return;
        }
        if !self.binding.options.close_on_drop {
            warn!(kind = %self.kind, "Proxy dropped while open, resource not closed");
            return;
        }
        if let Err(e) = self.close() {
            warn!(kind = %self.kind, error = %e, "Close on drop failed");
        }
    }
}

impl<R: Resource + 'static> fmt::Debug for Lifecycle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("enlisted_in", &self.enlisted_in())
            .finish()
    }
}
