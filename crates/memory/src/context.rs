//! Memory contexts

use crate::broker::Broker;
use crate::connection::{client_id_already_set, metadata};
use crate::journal::ResourceId;
use crate::session::Delivery;
use parking_lot::Mutex;
use std::sync::Arc;
use xaproxy_core::{
    ConnectionMetadata, Context, Destination, Message, MessageBody, MessageConsumer,
    MessageProducer, Resource, ResourceKind, Result, SessionMode, XaResource,
};

/// Connection-level state shared by a context and the contexts created from it
#[derive(Debug, Default)]
struct Shared {
    client_id: Option<String>,
    started: bool,
}

/// Memory context
pub struct MemoryContext {
    id: ResourceId,
    xa: bool,
    auto_start: bool,
    shared: Arc<Mutex<Shared>>,
    delivery: Arc<Delivery>,
}

impl MemoryContext {
    pub(crate) fn new(broker: &Broker, mode: SessionMode, xa: bool) -> Self {
        Self::with_shared(broker, mode, xa, Arc::default())
    }

    fn with_shared(
        broker: &Broker,
        mode: SessionMode,
        xa: bool,
        shared: Arc<Mutex<Shared>>,
    ) -> Self {
        MemoryContext {
            id: broker.created(ResourceKind::Context),
            xa,
            auto_start: true,
            shared,
            delivery: Delivery::new(broker.clone(), ResourceKind::Context, mode, xa),
        }
    }

    /// Journal id of this context
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Whether delivery has been started on the shared connection
    pub fn is_started(&self) -> bool {
        self.shared.lock().started
    }

    fn auto_start_delivery(&self) {
        if self.auto_start {
            self.shared.lock().started = true;
        }
    }
}

impl Resource for MemoryContext {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Context
    }

    fn close(&mut self) -> Result<()> {
        self.delivery.mark_closed();
        self.delivery.broker().close(self.id, ResourceKind::Context)
    }
}

impl Context for MemoryContext {
    fn create_context(&mut self, mode: SessionMode) -> Result<Box<dyn Context>> {
        self.delivery.ensure_open()?;
        Ok(Box::new(MemoryContext::with_shared(
            self.delivery.broker(),
            mode,
            self.xa,
            Arc::clone(&self.shared),
        )))
    }

    fn create_message(&self, body: MessageBody) -> Result<Message> {
        self.delivery.ensure_open()?;
        Ok(Message::new(body))
    }

    fn create_queue(&self, name: &str) -> Result<Destination> {
        self.delivery.ensure_open()?;
        Ok(Destination::queue(name))
    }

    fn create_topic(&self, name: &str) -> Result<Destination> {
        self.delivery.ensure_open()?;
        Ok(Destination::topic(name))
    }

    fn create_producer(&mut self) -> Result<Box<dyn MessageProducer>> {
        self.delivery.create_producer(None)
    }

    fn create_consumer(
        &mut self,
        destination: &Destination,
        selector: Option<&str>,
    ) -> Result<Box<dyn MessageConsumer>> {
        let consumer = self.delivery.create_consumer(destination, selector)?;
        self.auto_start_delivery();
        Ok(consumer)
    }

    fn client_id(&self) -> Result<Option<String>> {
        self.delivery.ensure_open()?;
        Ok(self.shared.lock().client_id.clone())
    }

    fn set_client_id(&mut self, client_id: &str) -> Result<()> {
        self.delivery.ensure_open()?;
        let mut shared = self.shared.lock();
        if let Some(current) = &shared.client_id {
            return Err(client_id_already_set(current));
        }
        shared.client_id = Some(client_id.to_string());
        Ok(())
    }

    fn metadata(&self) -> Result<ConnectionMetadata> {
        self.delivery.ensure_open()?;
        Ok(metadata())
    }

    fn mode(&self) -> Result<SessionMode> {
        self.delivery.ensure_open()?;
        Ok(self.delivery.mode())
    }

    fn start(&mut self) -> Result<()> {
        self.delivery.ensure_open()?;
        self.shared.lock().started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.delivery.ensure_open()?;
        self.shared.lock().started = false;
        Ok(())
    }

    fn auto_start(&self) -> Result<bool> {
        self.delivery.ensure_open()?;
        Ok(self.auto_start)
    }

    fn set_auto_start(&mut self, auto_start: bool) -> Result<()> {
        self.delivery.ensure_open()?;
        self.auto_start = auto_start;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.delivery.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.delivery.rollback()
    }

    fn recover(&mut self) -> Result<()> {
        self.delivery.ensure_open()
    }

    fn acknowledge(&mut self) -> Result<()> {
        self.delivery.ensure_open()
    }

    fn unsubscribe(&mut self, _name: &str) -> Result<()> {
        self.delivery.ensure_open()
    }

    fn xa_resource(&self) -> Option<Arc<dyn XaResource>> {
        self.delivery.xa_resource()
    }
}
