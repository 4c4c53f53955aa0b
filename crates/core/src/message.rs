//! Minimal message model used by the pass-through surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Target of a producer or source of a consumer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Destination {
    /// Point-to-point queue
    Queue(String),
    /// Publish/subscribe topic
    Topic(String),
}

impl Destination {
    /// Queue destination
    pub fn queue(name: impl Into<String>) -> Self {
        Destination::Queue(name.into())
    }

    /// Topic destination
    pub fn topic(name: impl Into<String>) -> Self {
        Destination::Topic(name.into())
    }

    /// Destination name without its kind
    pub fn name(&self) -> &str {
        match self {
            Destination::Queue(name) | Destination::Topic(name) => name,
        }
    }

    /// Check if this is a queue
    pub fn is_queue(&self) -> bool {
        matches!(self, Destination::Queue(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Queue(name) => write!(f, "queue://{}", name),
            Destination::Topic(name) => write!(f, "topic://{}", name),
        }
    }
}

/// Message payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageBody {
    /// No body
    #[default]
    Empty,
    /// Text payload
    Text(String),
    /// Opaque bytes
    Bytes(Vec<u8>),
    /// Name/value pairs
    Map(BTreeMap<String, String>),
}

/// A message as seen by producers and consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Provider assigned id
    pub id: String,
    /// Payload
    pub body: MessageBody,
    /// Application properties
    pub properties: BTreeMap<String, String>,
    /// Correlation id, if any
    pub correlation_id: Option<String>,
    /// Destination the message was sent to; set on send
    pub destination: Option<Destination>,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message with the given body and a fresh id
    pub fn new(body: MessageBody) -> Self {
        Self {
            id: format!("ID:{}", Uuid::new_v4()),
            body,
            properties: BTreeMap::new(),
            correlation_id: None,
            destination: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a text message
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MessageBody::Text(text.into()))
    }

    /// Create a bytes message
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(MessageBody::Bytes(bytes.into()))
    }

    /// Set an application property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Set the correlation id
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Text payload, if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text(text) => Some(text),
            _ => None,
        }
    }
}
