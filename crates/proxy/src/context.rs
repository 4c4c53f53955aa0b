//! Context proxy

use crate::enlist::enlist_created;
use crate::lifecycle::{Binding, Enlistment, Lifecycle, LifecycleState};
use std::sync::Arc;
use tracing::trace;
use xaproxy_core::{
    Capability, ConnectionMetadata, Context, Destination, Message, MessageBody, MessageConsumer,
    MessageProducer, Resource, ResourceKind, Result, SessionMode, TransactionId, XaResource,
};

/// Context wrapper; a context is a connection and a session in one
#[derive(Debug)]
pub struct ContextProxy {
    lifecycle: Lifecycle<Box<dyn Context>>,
}

impl ContextProxy {
    pub(crate) fn new(context: Box<dyn Context>, enlistment: Enlistment, binding: Binding) -> Self {
        ContextProxy {
            lifecycle: Lifecycle::new(context, enlistment, binding),
        }
    }

    /// Wrap a context created inside `transaction`, enlisting its handle when
    /// `enlist` is set. The context is closed if enlistment fails.
    pub(crate) fn managed(
        binding: Binding,
        transaction: TransactionId,
        mut context: Box<dyn Context>,
        enlist: bool,
    ) -> Result<Self> {
        let handle = if enlist {
            let handle = context.xa_resource();
            Some(enlist_created(
                &binding,
                transaction,
                &mut context,
                handle,
                Capability::XaContext,
            )?)
        } else {
            None
        };
        trace!(txn = %transaction, enlisted = handle.is_some(), "Created managed context");
        Ok(ContextProxy::new(
            context,
            Enlistment::managed(transaction, handle),
            binding,
        ))
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Transaction this context was created and enlisted in
    pub fn enlisted_in(&self) -> Option<TransactionId> {
        self.lifecycle.enlisted_in()
    }
}

impl Resource for ContextProxy {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Context
    }

    fn close(&mut self) -> Result<()> {
        self.lifecycle.close()
    }
}

impl Context for ContextProxy {
    /// Sub-contexts get their own decision: native outside a transaction,
    /// managed (and enlisted when they carry a handle) inside one.
    fn create_context(&mut self, mode: SessionMode) -> Result<Box<dyn Context>> {
        let binding = self.lifecycle.binding().clone();
        let context = self.lifecycle.resource_mut()?;
        match binding.current_transaction()? {
            None => context.create_context(mode),
            Some(transaction) => {
                let sub = context.create_context(mode)?;
                let enlist = sub.xa_resource().is_some();
                Ok(Box::new(ContextProxy::managed(
                    binding,
                    transaction,
                    sub,
                    enlist,
                )?))
            }
        }
    }

    fn create_message(&self, body: MessageBody) -> Result<Message> {
        self.lifecycle.resource()?.create_message(body)
    }

    fn create_queue(&self, name: &str) -> Result<Destination> {
        self.lifecycle.resource()?.create_queue(name)
    }

    fn create_topic(&self, name: &str) -> Result<Destination> {
        self.lifecycle.resource()?.create_topic(name)
    }

    fn create_producer(&mut self) -> Result<Box<dyn MessageProducer>> {
        self.lifecycle.resource_mut()?.create_producer()
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

    fn client_id(&self) -> Result<Option<String>> {
        self.lifecycle.resource()?.client_id()
    }

    fn set_client_id(&mut self, client_id: &str) -> Result<()> {
        self.lifecycle.resource_mut()?.set_client_id(client_id)
    }

    fn metadata(&self) -> Result<ConnectionMetadata> {
        self.lifecycle.resource()?.metadata()
    }

    fn mode(&self) -> Result<SessionMode> {
        self.lifecycle.resource()?.mode()
    }

    fn start(&mut self) -> Result<()> {
        self.lifecycle.resource_mut()?.start()
    }

    fn stop(&mut self) -> Result<()> {
        self.lifecycle.resource_mut()?.stop()
    }

    fn auto_start(&self) -> Result<bool> {
        self.lifecycle.resource()?.auto_start()
    }

    fn set_auto_start(&mut self, auto_start: bool) -> Result<()> {
        self.lifecycle.resource_mut()?.set_auto_start(auto_start)
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

    fn acknowledge(&mut self) -> Result<()> {
        self.lifecycle.resource_mut()?.acknowledge()
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
                .and_then(|context| context.xa_resource()),
        }
    }
}
