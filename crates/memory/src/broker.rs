//! In-memory broker shared by every factory, connection and session
//!
//! Queues hand each message to one consumer. Topics keep an append-only log;
//! each subscriber reads from its own position, starting at the end of the
//! log when it subscribes.

use crate::journal::{Journal, JournalEvent, ResourceId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;
use xaproxy_core::{
    Credentials, Destination, Error, Message, ProviderError, ResourceKind, Result,
};

#[derive(Debug, Default)]
struct Faults {
    close: Mutex<HashMap<ResourceKind, usize>>,
    xa_start: AtomicBool,
    xa_end: AtomicBool,
    xa_prepare: AtomicBool,
}

#[derive(Debug)]
struct BrokerInner {
    name: String,
    users: HashMap<String, String>,
    queues: DashMap<String, VecDeque<Message>>,
    topics: DashMap<String, Vec<Message>>,
    journal: Journal,
    faults: Faults,
}

/// Handle to an in-memory broker; clones share the same state
#[derive(Debug, Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

impl Broker {
    /// Create a broker that accepts any credentials
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    /// Create a builder
    pub fn builder(name: impl Into<String>) -> BrokerBuilder {
        BrokerBuilder {
            name: name.into(),
            users: HashMap::new(),
        }
    }

    /// Broker name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Identity reported by this broker's XA handles
    pub fn resource_manager_id(&self) -> String {
        format!("memory://{}", self.inner.name)
    }

    /// Creation and close journal
    pub fn journal(&self) -> &Journal {
        &self.inner.journal
    }

    /// Messages waiting on a queue, oldest first
    pub fn browse(&self, queue: &str) -> Vec<Message> {
        self.inner
            .queues
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of messages waiting on a queue
    pub fn queue_depth(&self, queue: &str) -> usize {
        self.inner.queues.get(queue).map(|q| q.len()).unwrap_or(0)
    }

    /// Number of messages ever published to a topic
    pub fn topic_len(&self, topic: &str) -> usize {
        self.inner.topics.get(topic).map(|t| t.len()).unwrap_or(0)
    }

    /// Make the next close of a resource of `kind` fail
    pub fn fail_next_close(&self, kind: ResourceKind) {
        *self.inner.faults.close.lock().entry(kind).or_insert(0) += 1;
    }

    /// Make `XaResource::start` fail, which makes enlistment fail
    pub fn fail_xa_start(&self, fail: bool) {
        self.inner.faults.xa_start.store(fail, Ordering::SeqCst);
    }

    /// Make `XaResource::end` fail, which makes delistment fail
    pub fn fail_xa_end(&self, fail: bool) {
        self.inner.faults.xa_end.store(fail, Ordering::SeqCst);
    }

    /// Make `XaResource::prepare` fail
    pub fn fail_xa_prepare(&self, fail: bool) {
        self.inner.faults.xa_prepare.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn xa_start_fails(&self) -> bool {
        self.inner.faults.xa_start.load(Ordering::SeqCst)
    }

    pub(crate) fn xa_end_fails(&self) -> bool {
        self.inner.faults.xa_end.load(Ordering::SeqCst)
    }

    pub(crate) fn xa_prepare_fails(&self) -> bool {
        self.inner.faults.xa_prepare.load(Ordering::SeqCst)
    }

    pub(crate) fn authenticate(&self, credentials: Option<&Credentials>) -> Result<()> {
        if self.inner.users.is_empty() {
            return Ok(());
        }
        match credentials {
            Some(c) if self.inner.users.get(&c.user) == Some(&c.password) => Ok(()),
            Some(c) => Err(ProviderError::with_code(
                "SECURITY",
                format!("authentication failed for user {}", c.user),
            )
            .into()),
            None => Err(ProviderError::with_code("SECURITY", "credentials required").into()),
        }
    }

    pub(crate) fn created(&self, kind: ResourceKind) -> ResourceId {
        let id = self.inner.journal.created(kind);
        trace!(broker = %self.inner.name, %kind, id, "Resource created");
        id
    }

    /// Record a close of `id`, failing if a close fault is armed for `kind`
    pub(crate) fn close(&self, id: ResourceId, kind: ResourceKind) -> Result<()> {
        let fail = {
            let mut faults = self.inner.faults.close.lock();
            match faults.get_mut(&kind) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            }
        };
        if fail {
            self.inner
                .journal
                .record(id, kind, JournalEvent::CloseFailed);
            return Err(ProviderError::with_code("CLOSE_FAILED", format!("{} {} failed to close", kind, id)).into());
        }
        self.inner.journal.record(id, kind, JournalEvent::Closed);
        trace!(broker = %self.inner.name, %kind, id, "Resource closed");
        Ok(())
    }

    /// Make a message visible to consumers
    pub(crate) fn deliver(&self, destination: &Destination, mut message: Message) {
        message.destination = Some(destination.clone());
        trace!(broker = %self.inner.name, %destination, id = %message.id, "Delivering message");
        match destination {
            Destination::Queue(name) => self
                .inner
                .queues
                .entry(name.clone())
                .or_default()
                .push_back(message),
            Destination::Topic(name) => self
                .inner
                .topics
                .entry(name.clone())
                .or_default()
                .push(message),
        }
    }

    /// Remove the first queued message accepted by `accept`
    pub(crate) fn take_from_queue(
        &self,
        queue: &str,
        accept: impl Fn(&Message) -> bool,
    ) -> Option<Message> {
        let mut messages = self.inner.queues.get_mut(queue)?;
        let index = messages.iter().position(|m| accept(m))?;
        messages.remove(index)
    }

    /// Next topic message at or after `position` accepted by `accept`
    ///
    /// Returns the message and the position to read from next.
    pub(crate) fn read_topic(
        &self,
        topic: &str,
        position: usize,
        accept: impl Fn(&Message) -> bool,
    ) -> (Option<Message>, usize) {
        let Some(log) = self.inner.topics.get(topic) else {
            return (None, position);
        };
        match log.iter().skip(position).position(|m| accept(m)) {
            Some(offset) => (Some(log[position + offset].clone()), position + offset + 1),
            None => (None, log.len()),
        }
    }

    pub(crate) fn topic_end(&self, topic: &str) -> usize {
        self.topic_len(topic)
    }

    pub(crate) fn closed_error(kind: ResourceKind) -> Error {
        ProviderError::with_code("ILLEGAL_STATE", format!("{} is closed", kind)).into()
    }
}

/// Builder for [`Broker`]
#[derive(Debug)]
pub struct BrokerBuilder {
    name: String,
    users: HashMap<String, String>,
}

impl BrokerBuilder {
    /// Require credentials and accept this user
    pub fn user(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(user.into(), password.into());
        self
    }

    /// Build the broker
    pub fn build(self) -> Broker {
        Broker {
            inner: Arc::new(BrokerInner {
                name: self.name,
                users: self.users,
                queues: DashMap::new(),
                topics: DashMap::new(),
                journal: Journal::default(),
                faults: Faults::default(),
            }),
        }
    }
}
