//! Session proxy

use crate::lifecycle::{Binding, Enlistment, Lifecycle, LifecycleState};
use std::sync::Arc;
use xaproxy_core::{
    Destination, Message, MessageBody, MessageConsumer, MessageProducer, Resource, ResourceKind,
    Result, Session, SessionMode, TransactionId, XaResource,
};

/// Session wrapper that defers its close to transaction completion
///
/// Created by [`crate::ConnectionProxy`] while a transaction is active.
#[derive(Debug)]
pub struct SessionProxy {
    lifecycle: Lifecycle<Box<dyn Session>>,
}

impl SessionProxy {
    pub(crate) fn new(session: Box<dyn Session>, enlistment: Enlistment, binding: Binding) -> Self {
        SessionProxy {
            lifecycle: Lifecycle::new(session, enlistment, binding),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Transaction this session was created and enlisted in
    pub fn enlisted_in(&self) -> Option<TransactionId> {
        self.lifecycle.enlisted_in()
    }
}

impl Resource for SessionProxy {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Session
    }

    fn close(&mut self) -> Result<()> {
        self.lifecycle.close()
    }
}

impl Session for SessionProxy {
    fn create_message(&self, body: MessageBody) -> Result<Message> {
        self.lifecycle.resource()?.create_message(body)
    }

    fn create_queue(&self, name: &str) -> Result<Destination> {
        self.lifecycle.resource()?.create_queue(name)
    }

    fn create_topic(&self, name: &str) -> Result<Destination> {
        self.lifecycle.resource()?.create_topic(name)
    }

    fn create_producer(
        &mut self,
        destination: Option<&Destination>,
    ) -> Result<Box<dyn MessageProducer>> {
        self.lifecycle.resource_mut()?.create_producer(destination)
    }

    fn create_consumer(
        &mut self,
        destination: &Destination,
        selector: Option<&str>,
    ) -> Result<Box<dyn MessageConsumer>> {
        self.lifecycle
            .resource_mut()?
            .create_consumer(destination, selector)
    }

    fn mode(&self) -> Result<SessionMode> {
        self.lifecycle.resource()?.mode()
    }

    fn is_transacted(&self) -> Result<bool> {
        self.lifecycle.resource()?.is_transacted()
    }

    fn commit(&mut self) -> Result<()> {
        self.lifecycle.resource_mut()?.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.lifecycle.resource_mut()?.rollback()
    }

    fn recover(&mut self) -> Result<()> {
        self.lifecycle.resource_mut()?.recover()
    }

    fn unsubscribe(&mut self, name: &str) -> Result<()> {
        self.lifecycle.resource_mut()?.unsubscribe(name)
    }

    fn xa_resource(&self) -> Option<Arc<dyn XaResource>> {
        match self.lifecycle.handle() {
            Some(handle) => Some(Arc::clone(handle)),
            None => self
                .lifecycle
                .resource()
                .ok()
                .and_then(|session| session.xa_resource()),
        }
    }
}
