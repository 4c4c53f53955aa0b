//! Error types for xaproxy.
//!
//! The proxy layer raises only a handful of error kinds of its own. Everything
//! the messaging provider reports travels through [`Error::Provider`] without
//! being inspected or rewritten.
//!
//! | Variant | Raised when | Fatal |
//! |---------|-------------|-------|
//! | `Configuration` | a proxy is built without a required collaborator | yes |
//! | `CapabilityMismatch` | the provider cannot produce the requested shape | yes |
//! | `Coordination` | the transaction system refused a query, registration, enlist or delist | yes |
//! | `ResourceClose` | physically closing a provider resource failed | no |
//! | `IllegalState` | an operation was attempted on a proxy that is no longer open | yes |
//! | `Provider` | pass-through failure from the provider | yes |

use crate::types::{Capability, ResourceKind};
use thiserror::Error;

/// Failure reported by a messaging provider.
///
/// Mirrors the usual provider exception shape: a human readable message and an
/// optional vendor error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    /// Vendor specific error code, if the provider has one
    pub code: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl ProviderError {
    /// Create a provider error without an error code
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Create a provider error carrying a vendor error code
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// All xaproxy errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A proxy was constructed with a missing collaborator, or options could not be loaded
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The provider cannot produce the requested resource shape
    #[error("capability mismatch: {0} is not supported")]
    CapabilityMismatch(Capability),

    /// The transaction system rejected a status query, registration, enlist or delist
    #[error("coordination failure: {message}")]
    Coordination {
        /// Description of the rejected operation, including the coordinator's reason
        message: String,
    },

    /// Physically closing a provider resource failed
    ///
    /// Non-fatal: the proxy that reported it has still reached its terminal state.
    #[error("failed to close {kind}: {source}")]
    ResourceClose {
        /// Which resource level failed to close
        kind: ResourceKind,
        /// The provider's close failure
        #[source]
        source: Box<Error>,
    },

    /// Operation attempted on a proxy that has been closed or handed to a deferred close
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Pass-through failure from the messaging provider
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Result type for xaproxy operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a coordination failure from any displayable reason.
    pub fn coordination(message: impl Into<String>) -> Self {
        Error::Coordination {
            message: message.into(),
        }
    }

    /// Build a provider failure with the given message.
    pub fn provider(message: impl Into<String>) -> Self {
        Error::Provider(ProviderError::new(message))
    }

    /// Wrap a close failure of the given resource level.
    pub fn resource_close(kind: ResourceKind, source: Error) -> Self {
        Error::ResourceClose {
            kind,
            source: Box::new(source),
        }
    }

    /// Whether the failed call left the caller unable to continue.
    ///
    /// Only close failures are downgraded: the resource is gone either way.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::ResourceClose { .. })
    }

    /// Check if this is a coordination failure.
    pub fn is_coordination(&self) -> bool {
        matches!(self, Error::Coordination { .. })
    }

    /// Check if this is a capability mismatch.
    pub fn is_capability_mismatch(&self) -> bool {
        matches!(self, Error::CapabilityMismatch(_))
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check if this is a downgraded close failure.
    pub fn is_resource_close(&self) -> bool {
        matches!(self, Error::ResourceClose { .. })
    }

    /// The provider error carried by this error, if it came from the provider.
    pub fn as_provider(&self) -> Option<&ProviderError> {
        match self {
            Error::Provider(e) => Some(e),
            _ => None,
        }
    }
}
