//! In-memory transaction used by [`crate::LocalTransactionManager`]
//!
//! Tracks enlisted branches and completion callbacks, and drives the
//! enlisted handles when the transaction completes:
//!
//! ```text
//! commit, one branch:    end(TMSUCCESS) → commit(one_phase)
//! commit, many branches: end(TMSUCCESS) → prepare all → commit all
//!                        (any prepare failure → rollback all)
//! rollback:              end(TMFAIL) → rollback all
//! ```
//!
//! Handles are called with the state lock released.

use crate::error::{Result, TransactionError};
use crate::transaction::{RegistrationResult, Transaction};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};
use xaproxy_core::{
    Synchronization, TransactionId, TransactionStatus, Vote, XaFlags, XaResource, Xid,
};

/// XA format id used for branches created by the local manager
pub const FORMAT_ID: i32 = 0x7870_7879;

struct Branch {
    handle: Arc<dyn XaResource>,
    xid: Xid,
    associated: bool,
    suspended: bool,
}

impl Branch {
    fn is(&self, handle: &Arc<dyn XaResource>) -> bool {
        same_handle(&self.handle, handle)
    }
}

/// Handles are compared by the address of the object they point to.
fn same_handle(a: &Arc<dyn XaResource>, b: &Arc<dyn XaResource>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

struct TxnState {
    status: TransactionStatus,
    branches: Vec<Branch>,
    synchronizations: Vec<Box<dyn Synchronization>>,
}

/// A transaction owned by [`crate::LocalTransactionManager`]
pub struct LocalTransaction {
    id: TransactionId,
    next_branch: AtomicU32,
    state: Mutex<TxnState>,
}

impl LocalTransaction {
    pub(crate) fn new() -> Self {
        LocalTransaction {
            id: TransactionId::new(),
            next_branch: AtomicU32::new(0),
            state: Mutex::new(TxnState {
                status: TransactionStatus::Active,
                branches: Vec::new(),
                synchronizations: Vec::new(),
            }),
        }
    }

    /// Number of distinct handles enlisted so far
    pub fn branch_count(&self) -> usize {
        self.state.lock().branches.len()
    }

    /// Number of handles currently associated (enlisted and not delisted)
    pub fn associated_count(&self) -> usize {
        self.state
            .lock()
            .branches
            .iter()
            .filter(|b| b.associated)
            .count()
    }

    /// Number of registered completion callbacks
    pub fn synchronization_count(&self) -> usize {
        self.state.lock().synchronizations.len()
    }

    fn next_xid(&self) -> Result<Xid> {
        let qualifier = (self.next_branch.fetch_add(1, Ordering::Relaxed) + 1).to_be_bytes();
        Ok(Xid::new(FORMAT_ID, self.id.as_bytes(), &qualifier)?)
    }

    fn set_status(&self, status: TransactionStatus) {
        self.state.lock().status = status;
    }

    /// Run `before_completion` on every callback.
    ///
    /// A panicking callback marks the transaction rollback-only.
    pub(crate) fn before_completion(&self) {
        let mut syncs = std::mem::take(&mut self.state.lock().synchronizations);
        for sync in syncs.iter_mut() {
            if panic::catch_unwind(AssertUnwindSafe(|| sync.before_completion())).is_err() {
                error!(txn = %self.id, "before_completion callback panicked, marking rollback-only");
                let mut state = self.state.lock();
                if state.status == TransactionStatus::Active {
                    state.status = TransactionStatus::MarkedRollback;
                }
            }
        }
        let mut state = self.state.lock();
        syncs.append(&mut state.synchronizations);
        state.synchronizations = syncs;
    }

    /// Drive the enlisted handles to a final outcome and return it.
    pub(crate) fn complete(&self, commit: bool) -> TransactionStatus {
        let (commit, branches) = {
            let mut state = self.state.lock();
            let commit = commit && state.status == TransactionStatus::Active;
            state.status = if commit {
                TransactionStatus::Preparing
            } else {
                TransactionStatus::RollingBack
            };
            (commit, std::mem::take(&mut state.branches))
        };

        let outcome = if commit {
            self.commit_branches(&branches)
        } else {
            self.end_associated(&branches, XaFlags::Fail);
            self.rollback_branches(branches.iter());
            TransactionStatus::RolledBack
        };

        let mut state = self.state.lock();
        state.status = outcome;
        state.branches = branches;
        outcome
    }

    /// Run `after_completion` on every callback, consuming them.
    pub(crate) fn after_completion(&self, status: TransactionStatus) {
        let syncs = std::mem::take(&mut self.state.lock().synchronizations);
        debug!(txn = %self.id, %status, callbacks = syncs.len(), "Running completion callbacks");
        for sync in syncs {
            if panic::catch_unwind(AssertUnwindSafe(move || sync.after_completion(status))).is_err()
            {
                error!(txn = %self.id, %status, "after_completion callback panicked");
            }
        }
    }

    fn end_associated(&self, branches: &[Branch], flags: XaFlags) -> bool {
        let mut ok = true;
        for branch in branches.iter().filter(|b| b.associated) {
            if let Err(e) = branch.handle.end(&branch.xid, flags) {
                warn!(txn = %self.id, xid = %branch.xid, error = %e, "Failed to end branch");
                ok = false;
            }
        }
        ok
    }

    fn commit_branches(&self, branches: &[Branch]) -> TransactionStatus {
        if !self.end_associated(branches, XaFlags::Success) {
            self.rollback_branches(branches.iter());
            return TransactionStatus::RolledBack;
        }

        match branches {
            [] => TransactionStatus::Committed,
            [only] => {
                self.set_status(TransactionStatus::Committing);
                match only.handle.commit(&only.xid, true) {
                    Ok(()) => TransactionStatus::Committed,
                    Err(e) => {
                        warn!(txn = %self.id, xid = %only.xid, error = %e, "One-phase commit failed");
                        TransactionStatus::RolledBack
                    }
                }
            }
            _ => {
                let mut voted_commit = Vec::with_capacity(branches.len());
                for branch in branches {
                    match branch.handle.prepare(&branch.xid) {
                        Ok(Vote::Commit) => voted_commit.push(branch),
                        Ok(Vote::ReadOnly) => {}
                        Err(e) => {
                            warn!(txn = %self.id, xid = %branch.xid, error = %e, "Prepare failed, rolling back");
                            // Read-only voters are already complete
                            let read_only: Vec<&Branch> = branches
                                .iter()
                                .take_while(|b| !b.is(&branch.handle))
                                .filter(|b| !voted_commit.iter().any(|v| v.is(&b.handle)))
                                .collect();
                            self.rollback_branches(
                                branches
                                    .iter()
                                    .filter(|b| !read_only.iter().any(|r| r.is(&b.handle))),
                            );
                            return TransactionStatus::RolledBack;
                        }
                    }
                }

                self.set_status(TransactionStatus::Prepared);
                self.set_status(TransactionStatus::Committing);
                for branch in voted_commit {
                    if let Err(e) = branch.handle.commit(&branch.xid, false) {
                        error!(txn = %self.id, xid = %branch.xid, error = %e, "Commit failed after prepare, outcome is heuristic");
                    }
                }
                TransactionStatus::Committed
            }
        }
    }

    fn rollback_branches<'a>(&self, branches: impl Iterator<Item = &'a Branch>) {
        for branch in branches {
            if let Err(e) = branch.handle.rollback(&branch.xid) {
                warn!(txn = %self.id, xid = %branch.xid, error = %e, "Rollback failed");
            }
        }
    }
}

impl Transaction for LocalTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    fn status(&self) -> TransactionStatus {
        self.state.lock().status
    }

    fn register_synchronization(
        &self,
        synchronization: Box<dyn Synchronization>,
    ) -> RegistrationResult {
        let mut state = self.state.lock();
        match state.status {
            TransactionStatus::Active => {
                state.synchronizations.push(synchronization);
                Ok(())
            }
            TransactionStatus::MarkedRollback => {
                Err((TransactionError::RollbackOnly(self.id), synchronization))
            }
            status => Err((
                TransactionError::IllegalState {
                    id: self.id,
                    status,
                },
                synchronization,
            )),
        }
    }

    fn enlist_resource(&self, handle: Arc<dyn XaResource>) -> Result<bool> {
        let (xid, flags) = {
            let state = self.state.lock();
            match state.status {
                TransactionStatus::Active => {}
                TransactionStatus::MarkedRollback => {
                    return Err(TransactionError::RollbackOnly(self.id))
                }
                status => {
                    return Err(TransactionError::IllegalState {
                        id: self.id,
                        status,
                    })
                }
            }

            let planned = match state.branches.iter().find(|b| b.is(&handle)) {
                Some(branch) if branch.associated => {
                    return Err(TransactionError::AlreadyEnlisted(
                        handle.resource_manager_id().to_string(),
                    ));
                }
                Some(branch) if branch.suspended => (branch.xid.clone(), XaFlags::Resume),
                Some(branch) => (branch.xid.clone(), XaFlags::Join),
                None => (self.next_xid()?, XaFlags::NoFlags),
            };
            planned
        };

        handle.start(&xid, flags)?;

        let mut state = self.state.lock();
        match state.branches.iter_mut().find(|b| b.is(&handle)) {
            Some(branch) => {
                branch.associated = true;
                branch.suspended = false;
            }
            None => {
                debug!(txn = %self.id, %xid, rm = handle.resource_manager_id(), "Enlisted branch");
                state.branches.push(Branch {
                    handle,
                    xid,
                    associated: true,
                    suspended: false,
                });
            }
        }
        Ok(true)
    }

    fn delist_resource(&self, handle: &Arc<dyn XaResource>, flags: XaFlags) -> Result<bool> {
        let xid = {
            let mut state = self.state.lock();
            match state.status {
                TransactionStatus::Active | TransactionStatus::MarkedRollback => {}
                status => {
                    return Err(TransactionError::IllegalState {
                        id: self.id,
                        status,
                    })
                }
            }

            let Some(branch) = state.branches.iter_mut().find(|b| b.is(handle) && b.associated)
            else {
                return Ok(false);
            };
            // Claimed before `end` so a concurrent delist sees it as gone
            branch.associated = false;
            branch.xid.clone()
        };

        let ended = handle.end(&xid, flags);

        let mut state = self.state.lock();
        let Some(branch) = state.branches.iter_mut().find(|b| b.is(handle)) else {
            return ended.map(|()| true).map_err(Into::into);
        };
        if let Err(e) = ended {
            branch.associated = true;
            return Err(e.into());
        }
        branch.suspended = flags == XaFlags::Suspend;
        if flags == XaFlags::Fail && state.status == TransactionStatus::Active {
            state.status = TransactionStatus::MarkedRollback;
        }
        Ok(true)
    }

    fn set_rollback_only(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.status {
            TransactionStatus::Active | TransactionStatus::MarkedRollback => {
                state.status = TransactionStatus::MarkedRollback;
                Ok(())
            }
            status => Err(TransactionError::IllegalState {
                id: self.id,
                status,
            }),
        }
    }
}

impl std::fmt::Debug for LocalTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LocalTransaction")
            .field("id", &self.id)
            .field("status", &state.status)
            .field("branches", &state.branches.len())
            .field("synchronizations", &state.synchronizations.len())
            .finish()
    }
}
