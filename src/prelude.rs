//! Convenient imports for xaproxy.
//!
//! ```ignore
//! use xaproxy::prelude::*;
//! ```

// Proxies
pub use xaproxy_proxy::{
    ConnectionFactoryProxy, ConnectionProxy, ContextProxy, LifecycleState, SessionProxy,
};

// Error handling and options
pub use xaproxy_core::{Error, ProxyOptions, Result};

// Provider surface
pub use xaproxy_core::{
    Connection, ConnectionFactory, Context, Credentials, Destination, Domain, Message,
    MessageBody, MessageConsumer, MessageProducer, Resource, ResourceKind, Session, SessionMode,
    XaConnection, XaConnectionFactory,
};

// Coordination
pub use xaproxy_core::{DelistFlag, TransactionCoordinator, TransactionId, TransactionStatus};

// Reference collaborators
pub use xaproxy_coordinator::{LocalTransactionManager, TransactionManager};
pub use xaproxy_memory::{Broker, MemoryConnectionFactory};
