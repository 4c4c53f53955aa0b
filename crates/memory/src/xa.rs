//! XA handle of a memory session or context
//!
//! While a branch is associated, sends are buffered under its xid. Commit
//! delivers the buffered messages, rollback discards them.

use crate::broker::Broker;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use xaproxy_core::{Destination, Message, Vote, XaError, XaFlags, XaResource, Xid};

#[derive(Default)]
struct Branches {
    active: Option<Xid>,
    work: HashMap<Xid, Vec<(Destination, Message)>>,
}

/// Resource-manager handle backed by a [`Broker`]
pub struct MemoryXaResource {
    broker: Broker,
    rm_id: String,
    branches: Mutex<Branches>,
}

impl MemoryXaResource {
    pub(crate) fn new(broker: Broker) -> Self {
        MemoryXaResource {
            rm_id: broker.resource_manager_id(),
            broker,
            branches: Mutex::new(Branches::default()),
        }
    }

    /// Branch currently associated with this handle
    pub fn active_branch(&self) -> Option<Xid> {
        self.branches.lock().active.clone()
    }

    /// Messages buffered across all branches
    pub fn pending(&self) -> usize {
        self.branches.lock().work.values().map(Vec::len).sum()
    }

    /// Buffer a send under the associated branch; hands the message back when
    /// no branch is associated
    pub(crate) fn buffer(
        &self,
        destination: &Destination,
        message: Message,
    ) -> Option<(Destination, Message)> {
        let mut branches = self.branches.lock();
        let Some(xid) = branches.active.clone() else {
            return Some((destination.clone(), message));
        };
        branches
            .work
            .entry(xid)
            .or_default()
            .push((destination.clone(), message));
        None
    }

    fn take(&self, xid: &Xid) -> Result<Vec<(Destination, Message)>, XaError> {
        let mut branches = self.branches.lock();
        if branches.active.as_ref() == Some(xid) {
            branches.active = None;
        }
        branches
            .work
            .remove(xid)
            .ok_or_else(|| XaError::Protocol(format!("unknown branch {}", xid)))
    }
}

impl XaResource for MemoryXaResource {
    fn resource_manager_id(&self) -> &str {
        &self.rm_id
    }

    fn start(&self, xid: &Xid, flags: XaFlags) -> Result<(), XaError> {
        if self.broker.xa_start_fails() {
            return Err(XaError::ResourceManager("start refused".into()));
        }
        let mut branches = self.branches.lock();
        if let Some(active) = &branches.active {
            return Err(XaError::Protocol(format!("already associated with {}", active)));
        }
        let known = branches.work.contains_key(xid);
        match flags {
            XaFlags::NoFlags if known => {
                return Err(XaError::Protocol(format!("duplicate branch {}", xid)))
            }
            XaFlags::Join | XaFlags::Resume if !known => {
                return Err(XaError::Protocol(format!("unknown branch {}", xid)))
            }
            XaFlags::NoFlags | XaFlags::Join | XaFlags::Resume => {}
            other => return Err(XaError::Protocol(format!("invalid start flags {:?}", other))),
        }
        branches.work.entry(xid.clone()).or_default();
        branches.active = Some(xid.clone());
        Ok(())
    }

    fn end(&self, xid: &Xid, _flags: XaFlags) -> Result<(), XaError> {
        if self.broker.xa_end_fails() {
            return Err(XaError::ResourceManager("end refused".into()));
        }
        let mut branches = self.branches.lock();
        if branches.active.as_ref() != Some(xid) {
            return Err(XaError::Protocol(format!("not associated with {}", xid)));
        }
        branches.active = None;
        Ok(())
    }

    fn prepare(&self, xid: &Xid) -> Result<Vote, XaError> {
        if self.broker.xa_prepare_fails() {
            return Err(XaError::ResourceManager("prepare refused".into()));
        }
        let mut branches = self.branches.lock();
        match branches.work.get(xid) {
            None => Err(XaError::Protocol(format!("unknown branch {}", xid))),
            Some(work) if work.is_empty() => {
                branches.work.remove(xid);
                Ok(Vote::ReadOnly)
            }
            Some(_) => Ok(Vote::Commit),
        }
    }

    fn commit(&self, xid: &Xid, one_phase: bool) -> Result<(), XaError> {
        let work = self.take(xid)?;
        debug!(rm = %self.rm_id, %xid, one_phase, messages = work.len(), "Committing branch");
        for (destination, message) in work {
            self.broker.deliver(&destination, message);
        }
        Ok(())
    }

    fn rollback(&self, xid: &Xid) -> Result<(), XaError> {
        let discarded = self.take(xid).map(|work| work.len()).unwrap_or(0);
        debug!(rm = %self.rm_id, %xid, discarded, "Rolled back branch");
        Ok(())
    }
}

impl fmt::Debug for MemoryXaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryXaResource")
            .field("rm_id", &self.rm_id)
            .field("active", &self.active_branch())
            .finish()
    }
}
