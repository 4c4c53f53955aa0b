//! Memory sessions, producers and consumers

use crate::broker::Broker;
use crate::journal::ResourceId;
use crate::xa::MemoryXaResource;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use xaproxy_core::{
    Destination, Message, MessageBody, MessageConsumer, MessageProducer, ProviderError, Resource,
    ResourceKind, Result, Session, SessionMode, XaResource,
};

/// Send path shared by a session (or context) and its producers
///
/// Sends go to the associated XA branch if there is one, to the local
/// transaction buffer in transacted mode, and straight to the broker otherwise.
pub(crate) struct Delivery {
    broker: Broker,
    kind: ResourceKind,
    mode: SessionMode,
    xa: Option<Arc<MemoryXaResource>>,
    local: Mutex<Vec<(Destination, Message)>>,
    closed: AtomicBool,
}

impl Delivery {
    pub(crate) fn new(broker: Broker, kind: ResourceKind, mode: SessionMode, xa: bool) -> Arc<Self> {
        let xa = xa.then(|| Arc::new(MemoryXaResource::new(broker.clone())));
        Arc::new(Delivery {
            broker,
            kind,
            mode,
            xa,
            local: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    pub(crate) fn broker(&self) -> &Broker {
        &self.broker
    }

    pub(crate) fn mode(&self) -> SessionMode {
        self.mode
    }

    pub(crate) fn xa_resource(&self) -> Option<Arc<dyn XaResource>> {
        self.xa
            .as_ref()
            .map(|xa| Arc::clone(xa) as Arc<dyn XaResource>)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Broker::closed_error(self.kind));
        }
        Ok(())
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.local.lock().clear();
    }

    fn in_xa_branch(&self) -> bool {
        self.xa
            .as_ref()
            .map_or(false, |xa| xa.active_branch().is_some())
    }

    pub(crate) fn send(&self, destination: &Destination, message: Message) -> Result<()> {
        self.ensure_open()?;
        let (destination, message) = match &self.xa {
            Some(xa) => match xa.buffer(destination, message) {
                Some(returned) => returned,
                None => return Ok(()),
            },
            None => (destination.clone(), message),
        };
        if self.mode.is_transacted() {
            self.local.lock().push((destination, message));
        } else {
            self.broker.deliver(&destination, message);
        }
        Ok(())
    }

    pub(crate) fn commit(&self) -> Result<()> {
        self.ensure_open()?;
        if self.in_xa_branch() {
            return Err(ProviderError::with_code(
                "TRANSACTION_IN_PROGRESS",
                "commit is not allowed while enlisted in a global transaction",
            )
            .into());
        }
        if !self.mode.is_transacted() {
            return Err(ProviderError::with_code("ILLEGAL_STATE", "session is not transacted").into());
        }
        let work = std::mem::take(&mut *self.local.lock());
        for (destination, message) in work {
            self.broker.deliver(&destination, message);
        }
        Ok(())
    }

    pub(crate) fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        if self.in_xa_branch() {
            return Err(ProviderError::with_code(
                "TRANSACTION_IN_PROGRESS",
                "rollback is not allowed while enlisted in a global transaction",
            )
            .into());
        }
        if !self.mode.is_transacted() {
            return Err(ProviderError::with_code("ILLEGAL_STATE", "session is not transacted").into());
        }
        self.local.lock().clear();
        Ok(())
    }

    pub(crate) fn create_producer(
        self: &Arc<Self>,
        destination: Option<&Destination>,
    ) -> Result<Box<dyn MessageProducer>> {
        self.ensure_open()?;
        Ok(Box::new(MemoryProducer {
            delivery: Arc::clone(self),
            destination: destination.cloned(),
            closed: false,
        }))
    }

    pub(crate) fn create_consumer(
        &self,
        destination: &Destination,
        selector: Option<&str>,
    ) -> Result<Box<dyn MessageConsumer>> {
        self.ensure_open()?;
        let selector = selector.map(Selector::parse).transpose()?;
        let position = match destination {
            Destination::Topic(name) => self.broker.topic_end(name),
            Destination::Queue(_) => 0,
        };
        Ok(Box::new(MemoryConsumer {
            broker: self.broker.clone(),
            destination: destination.clone(),
            selector,
            position,
            closed: false,
        }))
    }
}

/// `name = 'value'` property selector
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    property: String,
    value: String,
}

impl Selector {
    fn parse(source: &str) -> Result<Self> {
        let invalid = || -> xaproxy_core::Error {
            ProviderError::with_code("INVALID_SELECTOR", format!("unsupported selector: {}", source))
                .into()
        };
        let (property, value) = source.split_once('=').ok_or_else(invalid)?;
        let property = property.trim();
        let value = value.trim();
        let value = value
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .ok_or_else(invalid)?;
        if property.is_empty() || property.contains(char::is_whitespace) {
            return Err(invalid());
        }
        Ok(Selector {
            property: property.to_string(),
            value: value.to_string(),
        })
    }

    fn matches(&self, message: &Message) -> bool {
        message.properties.get(&self.property) == Some(&self.value)
    }
}

/// Memory session
pub struct MemorySession {
    id: ResourceId,
    delivery: Arc<Delivery>,
}

impl MemorySession {
    pub(crate) fn new(broker: &Broker, mode: SessionMode, xa: bool) -> Self {
        MemorySession {
            id: broker.created(ResourceKind::Session),
            delivery: Delivery::new(broker.clone(), ResourceKind::Session, mode, xa),
        }
    }

    /// Journal id of this session
    pub fn id(&self) -> ResourceId {
        self.id
    }
}

impl Resource for MemorySession {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Session
    }

    fn close(&mut self) -> Result<()> {
        self.delivery.mark_closed();
        self.delivery.broker().close(self.id, ResourceKind::Session)
    }
}

impl Session for MemorySession {
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

    fn create_producer(
        &mut self,
        destination: Option<&Destination>,
    ) -> Result<Box<dyn MessageProducer>> {
        self.delivery.create_producer(destination)
    }

    fn create_consumer(
        &mut self,
        destination: &Destination,
        selector: Option<&str>,
    ) -> Result<Box<dyn MessageConsumer>> {
        self.delivery.create_consumer(destination, selector)
    }

    fn mode(&self) -> Result<SessionMode> {
        self.delivery.ensure_open()?;
        Ok(self.delivery.mode())
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

    fn unsubscribe(&mut self, _name: &str) -> Result<()> {
        self.delivery.ensure_open()
    }

    fn xa_resource(&self) -> Option<Arc<dyn XaResource>> {
        self.delivery.xa_resource()
    }
}

/// Memory producer
pub struct MemoryProducer {
    delivery: Arc<Delivery>,
    destination: Option<Destination>,
    closed: bool,
}

impl MessageProducer for MemoryProducer {
    fn send(&mut self, destination: Option<&Destination>, message: Message) -> Result<()> {
        if self.closed {
            return Err(ProviderError::with_code("ILLEGAL_STATE", "producer is closed").into());
        }
        let target = destination
            .or(self.destination.as_ref())
            .ok_or_else(|| ProviderError::with_code("INVALID_DESTINATION", "no destination given"))?;
        self.delivery.send(target, message)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Memory consumer
pub struct MemoryConsumer {
    broker: Broker,
    destination: Destination,
    selector: Option<Selector>,
    position: usize,
    closed: bool,
}

impl MemoryConsumer {
    fn poll(&mut self) -> Option<Message> {
        let selector = self.selector.clone();
        let accept = move |m: &Message| selector.as_ref().map_or(true, |s| s.matches(m));
        match &self.destination {
            Destination::Queue(name) => self.broker.take_from_queue(name, accept),
            Destination::Topic(name) => {
                let (message, next) = self.broker.read_topic(name, self.position, accept);
                self.position = next;
                message
            }
        }
    }
}

impl MessageConsumer for MemoryConsumer {
    fn receive(&mut self, timeout: Duration) -> Result<Option<Message>> {
        if self.closed {
            return Err(ProviderError::with_code("ILLEGAL_STATE", "consumer is closed").into());
        }
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.poll() {
                return Ok(Some(message));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
