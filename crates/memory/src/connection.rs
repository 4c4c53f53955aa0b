//! Memory connections

use crate::broker::Broker;
use crate::journal::ResourceId;
use crate::session::MemorySession;
use xaproxy_core::{
    Connection, ConnectionMetadata, Domain, ProviderError, Resource, ResourceKind, Result,
    Session, SessionMode, XaConnection,
};

pub(crate) fn metadata() -> ConnectionMetadata {
    ConnectionMetadata {
        provider_name: "xaproxy-memory".to_string(),
        provider_version: env!("CARGO_PKG_VERSION").to_string(),
        api_version: "2.0".to_string(),
    }
}

pub(crate) fn client_id_already_set(current: &str) -> xaproxy_core::Error {
    ProviderError::with_code(
        "CLIENT_ID_SET",
        format!("client id is already set to {}", current),
    )
    .into()
}

/// Memory connection
///
/// Closing a connection does not close the sessions created from it; each
/// session is closed on its own.
#[derive(Debug)]
pub struct MemoryConnection {
    id: ResourceId,
    broker: Broker,
    domain: Domain,
    xa: bool,
    client_id: Option<String>,
    started: bool,
    closed: bool,
}

impl MemoryConnection {
    pub(crate) fn new(broker: &Broker, domain: Domain, xa: bool) -> Self {
        MemoryConnection {
            id: broker.created(ResourceKind::Connection),
            broker: broker.clone(),
            domain,
            xa,
            client_id: None,
            started: false,
            closed: false,
        }
    }

    /// Journal id of this connection
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Whether delivery has been started
    pub fn is_started(&self) -> bool {
        self.started
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Broker::closed_error(ResourceKind::Connection));
        }
        Ok(())
    }
}

impl Resource for MemoryConnection {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Connection
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.started = false;
        self.broker.close(self.id, ResourceKind::Connection)
    }
}

impl Connection for MemoryConnection {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn client_id(&self) -> Result<Option<String>> {
        self.ensure_open()?;
        Ok(self.client_id.clone())
    }

    fn set_client_id(&mut self, client_id: &str) -> Result<()> {
        self.ensure_open()?;
        if let Some(current) = &self.client_id {
            return Err(client_id_already_set(current));
        }
        self.client_id = Some(client_id.to_string());
        Ok(())
    }

    fn metadata(&self) -> Result<ConnectionMetadata> {
        self.ensure_open()?;
        Ok(metadata())
    }

    fn start(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.started = false;
        Ok(())
    }

    fn create_session(&mut self, mode: SessionMode) -> Result<Box<dyn Session>> {
        self.ensure_open()?;
        Ok(Box::new(MemorySession::new(&self.broker, mode, false)))
    }

    fn as_xa_mut(&mut self) -> Option<&mut dyn XaConnection> {
        if self.xa {
            Some(self)
        } else {
            None
        }
    }
}

impl XaConnection for MemoryConnection {
    fn create_xa_session(&mut self) -> Result<Box<dyn Session>> {
        self.ensure_open()?;
        Ok(Box::new(MemorySession::new(
            &self.broker,
            SessionMode::AutoAcknowledge,
            true,
        )))
    }
}
