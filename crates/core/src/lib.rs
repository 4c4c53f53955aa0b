//! Core types for xaproxy
//!
//! This crate defines everything the other crates agree on:
//! - Error taxonomy ([`Error`], [`ProviderError`])
//! - Messaging capability traits ([`ConnectionFactory`], [`Connection`], [`Session`], [`Context`])
//! - The resource-manager handle ([`XaResource`]) and branch ids ([`Xid`])
//! - The coordinator adapter ([`TransactionCoordinator`]) and completion callbacks ([`Synchronization`])
//! - Proxy configuration ([`ProxyOptions`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod message;
pub mod provider;
pub mod types;
pub mod xa;

pub use config::ProxyOptions;
pub use coordinator::{
    completion_fn, CompletionFn, Rejected, Synchronization, TransactionCoordinator,
    TransactionId, TransactionStatus,
};
pub use error::{Error, ProviderError, Result};
pub use message::{Destination, Message, MessageBody};
pub use provider::{
    Connection, ConnectionFactory, Context, MessageConsumer, MessageProducer, Resource, Session,
    XaConnection, XaConnectionFactory,
};
pub use types::{Capability, ConnectionMetadata, Credentials, Domain, ResourceKind, SessionMode};
pub use xa::{DelistFlag, Vote, XaError, XaFlags, XaResource, Xid};
