//! Core value types shared by every xaproxy crate
//!
//! - [`ResourceKind`]: which level of the resource hierarchy a value belongs to
//! - [`Domain`]: unified, point-to-point or publish/subscribe connections
//! - [`SessionMode`]: acknowledgement mode requested for a session or context
//! - [`Credentials`]: user name and password for authenticated creation calls
//! - [`Capability`]: an optional provider capability the proxy may depend on

use serde::{Deserialize, Serialize};
use std::fmt;

/// Level of a resource in the messaging hierarchy (factory → connection → session/context)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A provider connection
    Connection,
    /// A session created from a connection
    Session,
    /// A simplified-API context (connection and session in one)
    Context,
}

impl ResourceKind {
    /// Lower-case name used in log fields and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Connection => "connection",
            ResourceKind::Session => "session",
            ResourceKind::Context => "context",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messaging domain of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Domain {
    /// Domain-independent connection (queues and topics)
    #[default]
    Unified,
    /// Point-to-point only
    Queue,
    /// Publish/subscribe only
    Topic,
}

impl Domain {
    /// The capability a factory needs to serve this domain, if any
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Domain::Unified => None,
            Domain::Queue => Some(Capability::QueueDomain),
            Domain::Topic => Some(Capability::TopicDomain),
        }
    }
}

/// Acknowledgement mode of a session or context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionMode {
    /// Messages are acknowledged automatically on receipt
    #[default]
    AutoAcknowledge,
    /// The client acknowledges explicitly
    ClientAcknowledge,
    /// Lazy acknowledgement, duplicates allowed
    DupsOkAcknowledge,
    /// Local transaction, committed through the session
    Transacted,
}

impl SessionMode {
    /// Whether the mode uses a local (session level) transaction
    pub fn is_transacted(&self) -> bool {
        matches!(self, SessionMode::Transacted)
    }
}

/// User name and password passed to authenticated creation calls
///
/// The password never appears in `Debug` output, so credentials can be logged
/// as a structured field.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// User name
    pub user: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"...")
            .finish()
    }
}

/// Optional capability of a provider object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// The factory can create XA connections and contexts
    XaConnectionFactory,
    /// The factory can create point-to-point connections
    QueueDomain,
    /// The factory can create publish/subscribe connections
    TopicDomain,
    /// The connection can create XA sessions
    XaConnection,
    /// The session exposes a resource-manager handle
    XaSession,
    /// The context exposes a resource-manager handle
    XaContext,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::XaConnectionFactory => "XA connection factory",
            Capability::QueueDomain => "queue connection factory",
            Capability::TopicDomain => "topic connection factory",
            Capability::XaConnection => "XA connection",
            Capability::XaSession => "XA session",
            Capability::XaContext => "XA context",
        };
        f.write_str(name)
    }
}

/// Provider metadata reported by a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionMetadata {
    /// Provider product name
    pub provider_name: String,
    /// Provider version string
    pub provider_version: String,
    /// Messaging API version implemented by the provider
    pub api_version: String,
}
