//! Record of every resource the broker created and every close attempt
//!
//! Tests read the journal to check that each resource was physically closed
//! exactly once.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use xaproxy_core::ResourceKind;

/// Broker-assigned resource id
pub type ResourceId = u64;

/// What happened to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JournalEvent {
    /// The provider created the resource
    Created,
    /// A close call succeeded
    Closed,
    /// A close call failed (injected fault)
    CloseFailed,
}

impl JournalEvent {
    /// Whether this event is a physical close attempt
    pub fn is_close(&self) -> bool {
        matches!(self, JournalEvent::Closed | JournalEvent::CloseFailed)
    }
}

/// One journal line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalEntry {
    /// Resource the event belongs to
    pub resource: ResourceId,
    /// Resource level
    pub kind: ResourceKind,
    /// Event
    pub event: JournalEvent,
}

/// Append-only event log
#[derive(Debug, Default)]
pub struct Journal {
    next_id: AtomicU64,
    entries: Mutex<Vec<JournalEntry>>,
}

impl Journal {
    pub(crate) fn created(&self, kind: ResourceKind) -> ResourceId {
        let resource = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(resource, kind, JournalEvent::Created);
        resource
    }

    pub(crate) fn record(&self, resource: ResourceId, kind: ResourceKind, event: JournalEvent) {
        self.entries.lock().push(JournalEntry {
            resource,
            kind,
            event,
        });
    }

    /// Snapshot of every entry, oldest first
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().clone()
    }

    /// Number of resources of `kind` created so far
    pub fn creations_of(&self, kind: ResourceKind) -> usize {
        self.count(|e| e.kind == kind && e.event == JournalEvent::Created)
    }

    /// Number of close attempts on resources of `kind`, failed ones included
    pub fn closes_of(&self, kind: ResourceKind) -> usize {
        self.count(|e| e.kind == kind && e.event.is_close())
    }

    /// Close attempts per resource; resources never closed map to zero
    pub fn close_counts(&self) -> BTreeMap<ResourceId, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.lock().iter() {
            let count = counts.entry(entry.resource).or_insert(0);
            if entry.event.is_close() {
                *count += 1;
            }
        }
        counts
    }

    /// Resources created but never closed
    pub fn open_resources(&self) -> Vec<(ResourceId, ResourceKind)> {
        let entries = self.entries.lock();
        entries
            .iter()
            .filter(|e| e.event == JournalEvent::Created)
            .filter(|created| {
                !entries
                    .iter()
                    .any(|e| e.resource == created.resource && e.event.is_close())
            })
            .map(|e| (e.resource, e.kind))
            .collect()
    }

    fn count(&self, predicate: impl Fn(&JournalEntry) -> bool) -> usize {
        self.entries.lock().iter().filter(|e| predicate(e)).count()
    }
}
