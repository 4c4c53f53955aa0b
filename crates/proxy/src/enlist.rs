//! Enlistment of freshly created XA resources

use crate::lifecycle::Binding;
use std::sync::Arc;
use tracing::{debug, warn};
use xaproxy_core::{Capability, Error, Resource, Result, TransactionId, XaResource};

/// Enlist the handle of a resource that was just created for `transaction`
///
/// On any failure the resource is closed before the error is returned, so no
/// resource is left open without being registered.
pub(crate) fn enlist_created<R: Resource + ?Sized>(
    binding: &Binding,
    transaction: TransactionId,
    resource: &mut R,
    handle: Option<Arc<dyn XaResource>>,
    capability: Capability,
) -> Result<Arc<dyn XaResource>> {
    let kind = resource.kind();
    let outcome = match handle {
        Some(handle) => binding.coordinator.enlist(&handle).map(|()| handle),
        None => Err(Error::CapabilityMismatch(capability)),
    };

    match outcome {
        Ok(handle) => {
            debug!(%kind, txn = %transaction, rm = handle.resource_manager_id(), "Enlisted resource");
            Ok(handle)
        }
        Err(e) => {
            if let Err(close_err) = resource.close() {
                warn!(%kind, error = %close_err, "Failed to close resource after enlist failure");
            }
            Err(e)
        }
    }
}
