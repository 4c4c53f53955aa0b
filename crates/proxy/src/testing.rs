//! Test doubles: a scripted coordinator and a close-counting resource

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xaproxy_core::{
    DelistFlag, Error, ProviderError, Rejected, Resource, ResourceKind, Result, Synchronization,
    TransactionCoordinator, TransactionId, TransactionStatus, Vote, XaError, XaFlags, XaResource,
    Xid,
};

#[derive(Default)]
struct Script {
    current: Option<TransactionId>,
    calls: Vec<String>,
    callbacks: Vec<Box<dyn Synchronization>>,
    fail_status: bool,
    fail_enlist: bool,
    fail_delist: bool,
    reject_registration: bool,
}

/// Coordinator whose transaction and failures are set by the test
#[derive(Default)]
pub(crate) struct ScriptedCoordinator {
    script: Mutex<Script>,
}

impl ScriptedCoordinator {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn begin(&self) -> TransactionId {
        let id = TransactionId::new();
        self.script.lock().current = Some(id);
        id
    }

    /// End the transaction and run the registered callbacks
    pub(crate) fn complete(&self, status: TransactionStatus) {
        let callbacks = {
            let mut script = self.script.lock();
            script.current = None;
            std::mem::take(&mut script.callbacks)
        };
        for callback in callbacks {
            callback.after_completion(status);
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.script.lock().calls.clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.script.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub(crate) fn fail_status(&self, fail: bool) {
        self.script.lock().fail_status = fail;
    }

    pub(crate) fn fail_enlist(&self, fail: bool) {
        self.script.lock().fail_enlist = fail;
    }

    pub(crate) fn fail_delist(&self, fail: bool) {
        self.script.lock().fail_delist = fail;
    }

    pub(crate) fn reject_registration(&self, reject: bool) {
        self.script.lock().reject_registration = reject;
    }
}

impl TransactionCoordinator for ScriptedCoordinator {
    fn current_transaction(&self) -> Result<Option<TransactionId>> {
        let mut script = self.script.lock();
        script.calls.push("current".into());
        if script.fail_status {
            return Err(Error::coordination("status unavailable"));
        }
        Ok(script.current)
    }

    fn register_completion(
        &self,
        callback: Box<dyn Synchronization>,
    ) -> std::result::Result<(), Rejected> {
        let mut script = self.script.lock();
        script.calls.push("register".into());
        if script.reject_registration || script.current.is_none() {
            return Err(Rejected::new(
                Error::coordination("registration refused"),
                callback,
            ));
        }
        script.callbacks.push(callback);
        Ok(())
    }

    fn enlist(&self, _handle: &Arc<dyn XaResource>) -> Result<()> {
        let mut script = self.script.lock();
        script.calls.push("enlist".into());
        if script.fail_enlist {
            return Err(Error::coordination("error enlisting resource"));
        }
        Ok(())
    }

    fn delist(&self, _handle: &Arc<dyn XaResource>, flag: DelistFlag) -> Result<()> {
        let mut script = self.script.lock();
        let flag = match flag {
            DelistFlag::Success => "success",
            DelistFlag::Fail => "fail",
            DelistFlag::Suspend => "suspend",
        };
        script.calls.push(format!("delist:{}", flag));
        if script.fail_delist {
            return Err(Error::coordination("error delisting resource"));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct FakeHandle;

impl XaResource for FakeHandle {
    fn resource_manager_id(&self) -> &str {
        "fake"
    }
    fn start(&self, _: &Xid, _: XaFlags) -> std::result::Result<(), XaError> {
        Ok(())
    }
    fn end(&self, _: &Xid, _: XaFlags) -> std::result::Result<(), XaError> {
        Ok(())
    }
    fn prepare(&self, _: &Xid) -> std::result::Result<Vote, XaError> {
        Ok(Vote::Commit)
    }
    fn commit(&self, _: &Xid, _: bool) -> std::result::Result<(), XaError> {
        Ok(())
    }
    fn rollback(&self, _: &Xid) -> std::result::Result<(), XaError> {
        Ok(())
    }
}

struct FakeState {
    kind: ResourceKind,
    closes: AtomicUsize,
    fail_close: Mutex<Option<ProviderError>>,
    handle: Arc<dyn XaResource>,
}

/// Resource that counts close attempts; clones share the count
#[derive(Clone)]
pub(crate) struct FakeResource(Arc<FakeState>);

impl FakeResource {
    pub(crate) fn new(kind: ResourceKind) -> Self {
        FakeResource(Arc::new(FakeState {
            kind,
            closes: AtomicUsize::new(0),
            fail_close: Mutex::new(None),
            handle: Arc::new(FakeHandle),
        }))
    }

    pub(crate) fn closes(&self) -> usize {
        self.0.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_close(&self, error: ProviderError) {
        *self.0.fail_close.lock() = Some(error);
    }

    pub(crate) fn handle(&self) -> Arc<dyn XaResource> {
        Arc::clone(&self.0.handle)
    }
}

impl Resource for FakeResource {
    fn kind(&self) -> ResourceKind {
        self.0.kind
    }

    fn close(&mut self) -> Result<()> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        match self.0.fail_close.lock().take() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
