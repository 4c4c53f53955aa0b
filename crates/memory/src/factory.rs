//! Memory connection factories

use crate::broker::Broker;
use crate::connection::MemoryConnection;
use crate::context::MemoryContext;
use tracing::debug;
use xaproxy_core::{
    Connection, ConnectionFactory, Context, Credentials, Domain, ProviderError, Result,
    SessionMode, XaConnectionFactory,
};

/// Connection factory over a [`Broker`]
///
/// `new` builds a plain factory; `xa` builds one that also implements
/// [`XaConnectionFactory`]. Both serve the unified domain; queue and topic
/// domains are opt-in through [`with_domains`](Self::with_domains).
#[derive(Debug, Clone)]
pub struct MemoryConnectionFactory {
    broker: Broker,
    xa: bool,
    domains: Vec<Domain>,
}

impl MemoryConnectionFactory {
    /// Plain factory
    pub fn new(broker: Broker) -> Self {
        MemoryConnectionFactory {
            broker,
            xa: false,
            domains: vec![Domain::Unified],
        }
    }

    /// XA-capable factory
    pub fn xa(broker: Broker) -> Self {
        MemoryConnectionFactory {
            xa: true,
            ..Self::new(broker)
        }
    }

    /// Also serve the given domains
    pub fn with_domains(mut self, domains: &[Domain]) -> Self {
        for domain in domains {
            if !self.domains.contains(domain) {
                self.domains.push(*domain);
            }
        }
        self
    }

    /// Broker behind this factory
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    fn connect(
        &self,
        domain: Domain,
        credentials: Option<&Credentials>,
        xa: bool,
    ) -> Result<Box<dyn Connection>> {
        if !self.supports_domain(domain) {
            return Err(ProviderError::with_code(
                "UNSUPPORTED_DOMAIN",
                format!("{:?} connections are not supported", domain),
            )
            .into());
        }
        self.broker.authenticate(credentials)?;
        let connection = MemoryConnection::new(&self.broker, domain, xa);
        debug!(broker = %self.broker.name(), id = connection.id(), ?domain, xa, "Created connection");
        Ok(Box::new(connection))
    }

    fn open_context(
        &self,
        credentials: Option<&Credentials>,
        mode: SessionMode,
        xa: bool,
    ) -> Result<Box<dyn Context>> {
        self.broker.authenticate(credentials)?;
        let context = MemoryContext::new(&self.broker, mode, xa);
        debug!(broker = %self.broker.name(), id = context.id(), ?mode, xa, "Created context");
        Ok(Box::new(context))
    }
}

impl ConnectionFactory for MemoryConnectionFactory {
    fn create_connection(
        &self,
        domain: Domain,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>> {
        self.connect(domain, credentials, false)
    }

    fn create_context(
        &self,
        credentials: Option<&Credentials>,
        mode: Option<SessionMode>,
    ) -> Result<Box<dyn Context>> {
        self.open_context(credentials, mode.unwrap_or_default(), false)
    }

    fn supports_domain(&self, domain: Domain) -> bool {
        self.domains.contains(&domain)
    }

    fn as_xa(&self) -> Option<&dyn XaConnectionFactory> {
        if self.xa {
            Some(self)
        } else {
            None
        }
    }
}

impl XaConnectionFactory for MemoryConnectionFactory {
    fn create_xa_connection(
        &self,
        domain: Domain,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>> {
        self.connect(domain, credentials, true)
    }

    fn create_xa_context(&self, credentials: Option<&Credentials>) -> Result<Box<dyn Context>> {
        self.open_context(credentials, SessionMode::AutoAcknowledge, true)
    }
}
