//! Transaction-aware messaging resource proxies
//!
//! [`ConnectionFactoryProxy`] replaces a provider factory. At creation time it
//! asks the coordinator whether a transaction is active and either hands out
//! the provider's resource unchanged, or creates the XA variant, enlists its
//! resource-manager handle and wraps it in a lifecycle proxy whose close is
//! deferred until the transaction completes.
//!
//! - [`ConnectionProxy`], [`SessionProxy`], [`ContextProxy`]: one per resource level
//! - [`LifecycleState`]: `Open → ClosePending | Closed`
//! - [`DeferredClose`]: completion callback that performs the physical close

#![warn(missing_docs)]
#![warn(clippy::all)]

mod connection;
mod context;
mod deferred;
mod enlist;
mod factory;
mod lifecycle;
mod session;

#[cfg(test)]
mod testing;

pub use connection::ConnectionProxy;
pub use context::ContextProxy;
pub use deferred::DeferredClose;
pub use factory::{ConnectionFactoryProxy, ConnectionFactoryProxyBuilder};
pub use lifecycle::LifecycleState;
pub use session::SessionProxy;
