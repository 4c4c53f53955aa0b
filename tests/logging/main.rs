//! Log Output Tests
//!
//! Captures `tracing` output with a buffer-backed subscriber. Kept in its own
//! test binary so no other test races the callsite interest cache.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use xaproxy::prelude::*;

#[derive(Clone)]
struct BufMakeWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for BufMakeWriter {
    type Writer = BufWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufWriter(Arc::clone(&self.0))
    }
}

struct BufWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for BufWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn with_tracing_capture<F, R>(level: tracing::Level, f: F) -> (R, String)
where
    F: FnOnce() -> R,
{
    let buf = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(level)
        .with_writer(BufMakeWriter(Arc::clone(&buf)))
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let bytes = buf.lock().clone();
    (result, String::from_utf8_lossy(&bytes).to_string())
}

fn setup(options: ProxyOptions) -> (Arc<LocalTransactionManager>, Broker, ConnectionFactoryProxy) {
    let manager = Arc::new(LocalTransactionManager::new());
    let broker = Broker::new("logging");
    let factory = ConnectionFactoryProxy::with_options(
        Arc::new(MemoryConnectionFactory::xa(broker.clone())),
        Arc::new(manager.coordinator()),
        options,
    );
    (manager, broker, factory)
}

#[test]
fn test_failed_deferred_close_is_logged_not_raised() {
    let (manager, broker, factory) = setup(ProxyOptions::default());
    broker.fail_next_close(ResourceKind::Context);

    let (status, logs) = with_tracing_capture(tracing::Level::WARN, || {
        manager.begin().unwrap();
        let mut context = factory.create_context(None, None).unwrap();
        context.close().unwrap();
        manager.commit().unwrap()
    });

    assert_eq!(status, TransactionStatus::Committed);
    assert!(logs.contains("Deferred close failed"), "logs: {}", logs);
    assert!(logs.contains("context"), "logs: {}", logs);
    assert_eq!(broker.journal().closes_of(ResourceKind::Context), 1);
}

#[test]
fn test_leaked_proxy_is_reported() {
    let (_manager, broker, factory) = setup(ProxyOptions::explicit_close());

    let ((), logs) = with_tracing_capture(tracing::Level::WARN, || {
        drop(factory.create_connection(Domain::Unified, None).unwrap());
    });

    assert!(logs.contains("Proxy dropped while open"), "logs: {}", logs);
    assert_eq!(broker.journal().open_resources().len(), 1);
}

#[test]
fn test_creation_sites_are_traced_when_enabled() {
    let (_manager, _broker, factory) = setup(ProxyOptions::diagnostic());

    let ((), logs) = with_tracing_capture(tracing::Level::TRACE, || {
        let mut context = factory.create_context(None, None).unwrap();
        context.close().unwrap();
    });

    assert!(logs.contains("Creation site"), "logs: {}", logs);
    assert!(logs.contains("create_context"), "logs: {}", logs);
}
