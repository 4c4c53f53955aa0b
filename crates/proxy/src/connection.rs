//! Connection proxy
//!
//! Sessions are where transactional work happens, so session creation is the
//! one operation here with real logic. Each call asks the coordinator again:
//!
//! | Transaction | Connection is XA | Result |
//! |-------------|------------------|--------|
//! | none | any | provider session, unwrapped |
//! | active | yes | XA session, enlisted, wrapped in a managed [`SessionProxy`] |
//! | active | no | plain session wrapped in a managed [`SessionProxy`] |

use crate::enlist::enlist_created;
use crate::lifecycle::{Binding, Enlistment, Lifecycle, LifecycleState};
use crate::session::SessionProxy;
use tracing::trace;
use xaproxy_core::{
    Capability, Connection, ConnectionMetadata, Domain, Error, Resource, ResourceKind, Result,
    Session, SessionMode, TransactionId, XaConnection,
};

/// Connection wrapper that re-runs the transaction decision for each session
#[derive(Debug)]
pub struct ConnectionProxy {
    lifecycle: Lifecycle<Box<dyn Connection>>,
    domain: Domain,
    xa_capable: bool,
}

impl ConnectionProxy {
    pub(crate) fn new(
        mut connection: Box<dyn Connection>,
        enlistment: Enlistment,
        binding: Binding,
    ) -> Self {
        let xa_capable = connection.as_xa_mut().is_some();
        let domain = connection.domain();
        ConnectionProxy {
            lifecycle: Lifecycle::new(connection, enlistment, binding),
            domain,
            xa_capable,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Transaction this connection was created in, if it was created in one
    pub fn enlisted_in(&self) -> Option<TransactionId> {
        self.lifecycle.enlisted_in()
    }

    fn wrap_session(
        binding: Binding,
        transaction: TransactionId,
        mut session: Box<dyn Session>,
        enlist: bool,
    ) -> Result<Box<dyn Session>> {
        let handle = if enlist {
            let handle = session.xa_resource();
            Some(enlist_created(
                &binding,
                transaction,
                &mut session,
                handle,
                Capability::XaSession,
            )?)
        } else {
            None
        };
        trace!(txn = %transaction, enlisted = handle.is_some(), "Created managed session");
        Ok(Box::new(SessionProxy::new(
            session,
            Enlistment::managed(transaction, handle),
            binding,
        )))
    }
}

impl Resource for ConnectionProxy {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Connection
    }

    fn close(&mut self) -> Result<()> {
        self.lifecycle.close()
    }
}

impl Connection for ConnectionProxy {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn client_id(&self) -> Result<Option<String>> {
        self.lifecycle.resource()?.client_id()
    }

    fn set_client_id(&mut self, client_id: &str) -> Result<()> {
        self.lifecycle.resource_mut()?.set_client_id(client_id)
    }

    fn metadata(&self) -> Result<ConnectionMetadata> {
        self.lifecycle.resource()?.metadata()
    }

    fn start(&mut self) -> Result<()> {
        self.lifecycle.resource_mut()?.start()
    }

    fn stop(&mut self) -> Result<()> {
        self.lifecycle.resource_mut()?.stop()
    }

    fn create_session(&mut self, mode: SessionMode) -> Result<Box<dyn Session>> {
        let binding = self.lifecycle.binding().clone();
        let connection = self.lifecycle.resource_mut()?;
        let Some(transaction) = binding.current_transaction()? else {
            return connection.create_session(mode);
        };
        match connection.as_xa_mut() {
            Some(xa) => {
                let session = xa.create_xa_session()?;
                Self::wrap_session(binding, transaction, session, true)
            }
            None => {
                let session = connection.create_session(mode)?;
                Self::wrap_session(binding, transaction, session, false)
            }
        }
    }

    fn as_xa_mut(&mut self) -> Option<&mut dyn XaConnection> {
        if self.xa_capable {
            Some(self)
        } else {
            None
        }
    }
}

impl XaConnection for ConnectionProxy {
    fn create_xa_session(&mut self) -> Result<Box<dyn Session>> {
        let binding = self.lifecycle.binding().clone();
        let connection = self.lifecycle.resource_mut()?;
        let xa = connection
            .as_xa_mut()
            .ok_or(Error::CapabilityMismatch(Capability::XaConnection))?;
        match binding.current_transaction()? {
            None => xa.create_xa_session(),
            Some(transaction) => {
                let session = xa.create_xa_session()?;
                Self::wrap_session(binding, transaction, session, true)
            }
        }
    }
}
