//! # xaproxy
//!
//! Transaction-aware messaging resources.
//!
//! Resources handed out inside a transaction are enlisted with the coordinator
//! and their close is deferred until the transaction completes. Resources
//! handed out outside a transaction are the provider's own, untouched.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use xaproxy::prelude::*;
//!
//! let manager = Arc::new(LocalTransactionManager::new());
//! let broker = Broker::new("orders");
//! let factory = ConnectionFactoryProxy::new(
//!     Arc::new(MemoryConnectionFactory::xa(broker.clone())),
//!     Arc::new(manager.coordinator()),
//! );
//!
//! manager.begin()?;
//! let mut context = factory.create_context(None, None)?;
//! let mut producer = context.create_producer()?;
//! producer.send(Some(&Destination::queue("orders")), Message::text("hello"))?;
//! context.close()?; // deferred
//! manager.commit()?; // delivers, then closes the context
//! ```
//!
//! ## Crates
//!
//! - [`api`] - error taxonomy, provider traits, XA handle, coordinator adapter, options
//! - [`coordinator`] - reference transaction manager and its coordinator adapter
//! - [`proxy`] - factory, connection, session and context proxies
//! - [`memory`] - in-memory provider with a close journal and fault injection

#![warn(missing_docs)]

pub mod prelude;

pub use xaproxy_coordinator as coordinator;
pub use xaproxy_core as api;
pub use xaproxy_memory as memory;
pub use xaproxy_proxy as proxy;

pub use xaproxy_core::{Error, ProxyOptions, Result};
pub use xaproxy_proxy::{ConnectionFactoryProxy, ConnectionFactoryProxyBuilder, LifecycleState};
