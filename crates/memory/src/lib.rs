//! In-memory messaging provider
//!
//! A small provider implementing every xaproxy capability trait against a
//! process-local [`Broker`]. It exists so the proxies can be exercised end to
//! end without an external broker:
//!
//! - plain and XA factories ([`MemoryConnectionFactory::new`], [`MemoryConnectionFactory::xa`])
//! - XA handles that buffer sends per branch and deliver them on commit
//! - a [`Journal`] of every creation and physical close
//! - fault injection for close, `start`, `end` and `prepare`

#![warn(missing_docs)]
#![warn(clippy::all)]

mod broker;
mod connection;
mod context;
mod factory;
mod journal;
mod session;
mod xa;

pub use broker::{Broker, BrokerBuilder};
pub use connection::MemoryConnection;
pub use context::MemoryContext;
pub use factory::MemoryConnectionFactory;
pub use journal::{Journal, JournalEntry, JournalEvent, ResourceId};
pub use session::{MemoryConsumer, MemoryProducer, MemorySession};
pub use xa::MemoryXaResource;
