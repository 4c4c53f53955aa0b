//! Messaging provider capability traits
//!
//! These traits describe the provider surface the proxies consume and, at the
//! same time, the surface they expose: a proxy implements the same trait as
//! the object it wraps, so caller code does not change.
//!
//! Optional capabilities are discovered through accessors returning `Option`:
//!
//! | Object | Accessor | Capability |
//! |--------|----------|------------|
//! | factory | [`ConnectionFactory::as_xa`] | XA connections and contexts |
//! | factory | [`ConnectionFactory::supports_domain`] | queue / topic connections |
//! | connection | [`Connection::as_xa_mut`] | XA sessions |
//! | session | [`Session::xa_resource`] | resource-manager handle |
//! | context | [`Context::xa_resource`] | resource-manager handle |

use crate::error::Result;
use crate::message::{Destination, Message, MessageBody};
use crate::types::{ConnectionMetadata, Credentials, Domain, ResourceKind, SessionMode};
use crate::xa::XaResource;
use std::sync::Arc;
use std::time::Duration;

/// Something that holds provider-side state and must be closed exactly once
pub trait Resource: Send {
    /// Which level of the hierarchy this is
    fn kind(&self) -> ResourceKind;

    /// Release the provider-side resource
    fn close(&mut self) -> Result<()>;
}

impl<R: Resource + ?Sized> Resource for Box<R> {
    fn kind(&self) -> ResourceKind {
        (**self).kind()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Creates connections and contexts
pub trait ConnectionFactory: Send + Sync {
    /// Create a connection for the given domain
    fn create_connection(
        &self,
        domain: Domain,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>>;

    /// Create a context; `None` mode means the provider default
    fn create_context(
        &self,
        credentials: Option<&Credentials>,
        mode: Option<SessionMode>,
    ) -> Result<Box<dyn Context>>;

    /// Whether connections of the given domain can be created
    fn supports_domain(&self, domain: Domain) -> bool {
        domain == Domain::Unified
    }

    /// XA capability of this factory
    fn as_xa(&self) -> Option<&dyn XaConnectionFactory> {
        None
    }
}

/// Creates XA-capable connections and contexts
pub trait XaConnectionFactory: Send + Sync {
    /// Create a connection whose [`Connection::as_xa_mut`] is `Some`
    fn create_xa_connection(
        &self,
        domain: Domain,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>>;

    /// Create a context whose [`Context::xa_resource`] is `Some`
    fn create_xa_context(&self, credentials: Option<&Credentials>) -> Result<Box<dyn Context>>;
}

/// A provider connection
pub trait Connection: Resource {
    /// Domain this connection was created for
    fn domain(&self) -> Domain;

    /// Client identifier, if set
    fn client_id(&self) -> Result<Option<String>>;

    /// Set the client identifier
    fn set_client_id(&mut self, client_id: &str) -> Result<()>;

    /// Provider metadata
    fn metadata(&self) -> Result<ConnectionMetadata>;

    /// Start message delivery
    fn start(&mut self) -> Result<()>;

    /// Pause message delivery
    fn stop(&mut self) -> Result<()>;

    /// Create a session
    fn create_session(&mut self, mode: SessionMode) -> Result<Box<dyn Session>>;

    /// XA capability of this connection
    fn as_xa_mut(&mut self) -> Option<&mut dyn XaConnection> {
        None
    }
}

/// Creates XA sessions
pub trait XaConnection: Send {
    /// Create a session whose [`Session::xa_resource`] is `Some`
    fn create_xa_session(&mut self) -> Result<Box<dyn Session>>;
}

/// A provider session
pub trait Session: Resource {
    /// Create a message with the given body
    fn create_message(&self, body: MessageBody) -> Result<Message>;

    /// Resolve a queue by name
    fn create_queue(&self, name: &str) -> Result<Destination>;

    /// Resolve a topic by name
    fn create_topic(&self, name: &str) -> Result<Destination>;

    /// Create a producer; `None` means the destination is given per send
    fn create_producer(
        &mut self,
        destination: Option<&Destination>,
    ) -> Result<Box<dyn MessageProducer>>;

    /// Create a consumer
    fn create_consumer(
        &mut self,
        destination: &Destination,
        selector: Option<&str>,
    ) -> Result<Box<dyn MessageConsumer>>;

    /// Acknowledgement mode
    fn mode(&self) -> Result<SessionMode>;

    /// Whether the session uses a local transaction
    fn is_transacted(&self) -> Result<bool> {
        Ok(self.mode()?.is_transacted())
    }

    /// Commit the local transaction
    fn commit(&mut self) -> Result<()>;

    /// Roll back the local transaction
    fn rollback(&mut self) -> Result<()>;

    /// Redeliver unacknowledged messages
    fn recover(&mut self) -> Result<()>;

    /// Remove a durable subscription
    fn unsubscribe(&mut self, name: &str) -> Result<()>;

    /// Resource-manager handle of an XA session
    fn xa_resource(&self) -> Option<Arc<dyn XaResource>> {
        None
    }
}

/// A simplified-API context
pub trait Context: Resource {
    /// Create a new context sharing this context's connection
    fn create_context(&mut self, mode: SessionMode) -> Result<Box<dyn Context>>;

    /// Create a message with the given body
    fn create_message(&self, body: MessageBody) -> Result<Message>;

    /// Resolve a queue by name
    fn create_queue(&self, name: &str) -> Result<Destination>;

    /// Resolve a topic by name
    fn create_topic(&self, name: &str) -> Result<Destination>;

    /// Create a producer
    fn create_producer(&mut self) -> Result<Box<dyn MessageProducer>>;

    /// Create a consumer
    fn create_consumer(
        &mut self,
        destination: &Destination,
        selector: Option<&str>,
    ) -> Result<Box<dyn MessageConsumer>>;

    /// Client identifier, if set
    fn client_id(&self) -> Result<Option<String>>;

    /// Set the client identifier
    fn set_client_id(&mut self, client_id: &str) -> Result<()>;

    /// Provider metadata
    fn metadata(&self) -> Result<ConnectionMetadata>;

    /// Acknowledgement mode
    fn mode(&self) -> Result<SessionMode>;

    /// Start message delivery
    fn start(&mut self) -> Result<()>;

    /// Pause message delivery
    fn stop(&mut self) -> Result<()>;

    /// Whether consumers start delivery automatically
    fn auto_start(&self) -> Result<bool>;

    /// Enable or disable automatic start
    fn set_auto_start(&mut self, auto_start: bool) -> Result<()>;

    /// Commit the local transaction
    fn commit(&mut self) -> Result<()>;

    /// Roll back the local transaction
    fn rollback(&mut self) -> Result<()>;

    /// Redeliver unacknowledged messages
    fn recover(&mut self) -> Result<()>;

    /// Acknowledge all consumed messages
    fn acknowledge(&mut self) -> Result<()>;

    /// Remove a durable subscription
    fn unsubscribe(&mut self, name: &str) -> Result<()>;

    /// Resource-manager handle of an XA context
    fn xa_resource(&self) -> Option<Arc<dyn XaResource>> {
        None
    }
}

/// Sends messages
pub trait MessageProducer: Send {
    /// Send to the producer's destination, or to `destination` when given
    fn send(&mut self, destination: Option<&Destination>, message: Message) -> Result<()>;

    /// Close the producer
    fn close(&mut self) -> Result<()>;
}

/// Receives messages
pub trait MessageConsumer: Send {
    /// Receive the next message, waiting at most `timeout`
    fn receive(&mut self, timeout: Duration) -> Result<Option<Message>>;

    /// Receive the next message if one is immediately available
    fn receive_no_wait(&mut self) -> Result<Option<Message>> {
        self.receive(Duration::ZERO)
    }

    /// Close the consumer
    fn close(&mut self) -> Result<()>;
}
