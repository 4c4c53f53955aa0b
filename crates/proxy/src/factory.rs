//! Connection factory proxy: the entry point
//!
//! Every creation call starts by asking the coordinator for the current
//! transaction, then picks one of these paths:
//!
//! | Transaction | Factory is XA | Connection | Context |
//! |-------------|---------------|------------|---------|
//! | none | no | provider connection, unwrapped | provider context, unwrapped |
//! | none | yes | XA connection in an unmanaged proxy | plain context in an unmanaged proxy |
//! | active | yes | XA connection in a managed proxy | XA context, enlisted, managed proxy |
//! | active | no | plain connection in a managed proxy | plain context in a managed proxy |
//!
//! Connections carry no resource-manager handle of their own; their sessions
//! are enlisted when they are created (see [`crate::ConnectionProxy`]).

use crate::connection::ConnectionProxy;
use crate::context::ContextProxy;
use crate::lifecycle::{Binding, Enlistment};
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use xaproxy_core::{
    Capability, Connection, ConnectionFactory, Context, Credentials, Domain, Error, ProxyOptions,
    Result, SessionMode, TransactionCoordinator, TransactionId, XaConnectionFactory,
};

/// Transaction-aware replacement for a provider [`ConnectionFactory`]
///
/// # Example
///
/// ```ignore
/// let factory = ConnectionFactoryProxy::builder()
///     .factory(provider_factory)
///     .coordinator(coordinator)
///     .options(ProxyOptions::diagnostic())
///     .build()?;
///
/// let mut connection = factory.create_connection(Domain::Unified, None)?;
/// ```
#[derive(Clone)]
pub struct ConnectionFactoryProxy {
    factory: Arc<dyn ConnectionFactory>,
    binding: Binding,
}

impl ConnectionFactoryProxy {
    /// Wrap `factory`, using `coordinator` to find the active transaction
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        coordinator: Arc<dyn TransactionCoordinator>,
    ) -> Self {
        Self::with_options(factory, coordinator, ProxyOptions::default())
    }

    /// Like [`ConnectionFactoryProxy::new`] with explicit options
    pub fn with_options(
        factory: Arc<dyn ConnectionFactory>,
        coordinator: Arc<dyn TransactionCoordinator>,
        options: ProxyOptions,
    ) -> Self {
        ConnectionFactoryProxy {
            factory,
            binding: Binding::new(coordinator, options),
        }
    }

    /// Create a builder
    pub fn builder() -> ConnectionFactoryProxyBuilder {
        ConnectionFactoryProxyBuilder::new()
    }

    /// Options shared by every proxy this factory creates
    pub fn options(&self) -> &ProxyOptions {
        &self.binding.options
    }

    fn creation_site(&self, operation: &'static str) {
        if self.binding.options.capture_creation_sites {
            let site = Backtrace::force_capture();
            trace!(operation, site = %site, "Creation site");
        }
    }

    fn check_domain(&self, domain: Domain) -> Result<()> {
        match domain.required_capability() {
            Some(capability) if !self.factory.supports_domain(domain) => {
                Err(Error::CapabilityMismatch(capability))
            }
            _ => Ok(()),
        }
    }

    fn xa_factory(&self) -> Result<&dyn XaConnectionFactory> {
        self.factory
            .as_xa()
            .ok_or(Error::CapabilityMismatch(Capability::XaConnectionFactory))
    }

    fn enlistment(transaction: Option<TransactionId>) -> Enlistment {
        match transaction {
            Some(transaction) => Enlistment::managed(transaction, None),
            None => Enlistment::Unmanaged,
        }
    }

    fn wrap_connection(
        &self,
        connection: Box<dyn Connection>,
        transaction: Option<TransactionId>,
    ) -> Box<dyn Connection> {
        Box::new(ConnectionProxy::new(
            connection,
            Self::enlistment(transaction),
            self.binding.clone(),
        ))
    }

    fn wrap_context(
        &self,
        context: Box<dyn Context>,
        transaction: Option<TransactionId>,
    ) -> Box<dyn Context> {
        Box::new(ContextProxy::new(
            context,
            Self::enlistment(transaction),
            self.binding.clone(),
        ))
    }

    fn enlisted_context(
        &self,
        transaction: TransactionId,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Context>> {
        let context = self.xa_factory()?.create_xa_context(credentials)?;
        Ok(Box::new(ContextProxy::managed(
            self.binding.clone(),
            transaction,
            context,
            true,
        )?))
    }
}

impl ConnectionFactory for ConnectionFactoryProxy {
    fn create_connection(
        &self,
        domain: Domain,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>> {
        self.creation_site("create_connection");
        self.check_domain(domain)?;
        let transaction = self.binding.current_transaction()?;
        debug!(?domain, user = ?credentials.map(|c| c.user.as_str()), txn = ?transaction,
            xa = self.factory.as_xa().is_some(), "Creating connection");

        match (self.factory.as_xa(), transaction) {
            (Some(xa), transaction) => {
                let connection = xa.create_xa_connection(domain, credentials)?;
                Ok(self.wrap_connection(connection, transaction))
            }
            (None, None) => self.factory.create_connection(domain, credentials),
            (None, Some(transaction)) => {
                let connection = self.factory.create_connection(domain, credentials)?;
                Ok(self.wrap_connection(connection, Some(transaction)))
            }
        }
    }

    fn create_context(
        &self,
        credentials: Option<&Credentials>,
        mode: Option<SessionMode>,
    ) -> Result<Box<dyn Context>> {
        self.creation_site("create_context");
        let transaction = self.binding.current_transaction()?;
        debug!(user = ?credentials.map(|c| c.user.as_str()), ?mode, txn = ?transaction,
            xa = self.factory.as_xa().is_some(), "Creating context");

        match (self.factory.as_xa(), transaction) {
            (None, None) => self.factory.create_context(credentials, mode),
            (Some(_), None) => {
                let context = self.factory.create_context(credentials, mode)?;
                Ok(self.wrap_context(context, None))
            }
            (Some(_), Some(transaction)) => {
                if let Some(mode) = mode {
                    debug!(?mode, "Session mode ignored, the context joins the transaction");
                }
                self.enlisted_context(transaction, credentials)
            }
            (None, Some(transaction)) => {
                let context = self.factory.create_context(credentials, mode)?;
                Ok(self.wrap_context(context, Some(transaction)))
            }
        }
    }

    fn supports_domain(&self, domain: Domain) -> bool {
        self.factory.supports_domain(domain)
    }

    fn as_xa(&self) -> Option<&dyn XaConnectionFactory> {
        self.factory.as_xa().map(|_| self as &dyn XaConnectionFactory)
    }
}

impl XaConnectionFactory for ConnectionFactoryProxy {
    fn create_xa_connection(
        &self,
        domain: Domain,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>> {
        self.creation_site("create_xa_connection");
        let xa = self.xa_factory()?;
        self.check_domain(domain)?;
        let transaction = self.binding.current_transaction()?;
        trace!(?domain, txn = ?transaction, "Creating XA connection");

        let connection = xa.create_xa_connection(domain, credentials)?;
        Ok(self.wrap_connection(connection, transaction))
    }

    fn create_xa_context(&self, credentials: Option<&Credentials>) -> Result<Box<dyn Context>> {
        self.creation_site("create_xa_context");
        let xa = self.xa_factory()?;
        let transaction = self.binding.current_transaction()?;
        trace!(txn = ?transaction, "Creating XA context");

        match transaction {
            Some(transaction) => self.enlisted_context(transaction, credentials),
            None => {
                let context = xa.create_xa_context(credentials)?;
                Ok(self.wrap_context(context, None))
            }
        }
    }
}

impl fmt::Debug for ConnectionFactoryProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionFactoryProxy")
            .field("xa", &self.factory.as_xa().is_some())
            .field("options", &self.binding.options)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ConnectionFactoryProxy`]
///
/// `build` fails with [`Error::Configuration`] unless both the factory and the
/// coordinator were supplied.
#[derive(Default)]
pub struct ConnectionFactoryProxyBuilder {
    factory: Option<Arc<dyn ConnectionFactory>>,
    coordinator: Option<Arc<dyn TransactionCoordinator>>,
    options: ProxyOptions,
}

impl ConnectionFactoryProxyBuilder {
    /// Create a builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider factory to wrap
    pub fn factory(mut self, factory: Arc<dyn ConnectionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Coordinator reporting the active transaction
    pub fn coordinator(mut self, coordinator: Arc<dyn TransactionCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Proxy options
    pub fn options(mut self, options: ProxyOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the proxy
    pub fn build(self) -> Result<ConnectionFactoryProxy> {
        let factory = self
            .factory
            .ok_or_else(|| Error::Configuration("connection factory must be set".into()))?;
        let coordinator = self
            .coordinator
            .ok_or_else(|| Error::Configuration("transaction coordinator must be set".into()))?;
        Ok(ConnectionFactoryProxy::with_options(
            factory,
            coordinator,
            self.options,
        ))
    }
}
