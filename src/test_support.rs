use crate::config::{Config, LockConfiguration, LockType};
use crate::error::{Result, UniqueJobsError};
use crate::job::JobItem;
use crate::keys::{KeyScope, LockKeySet, LockMetadata};
use crate::manager::LockManager;
use crate::store::{LockStore, MemoryStore, ReleaseOutcome};
use serde_json::{Value, json};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const QUEUE: &str = "testqueue";

/// The classic example item: `JustAWorker` on `testqueue` with one hash argument.
pub(crate) fn just_a_worker() -> JobItem {
    JobItem::new("JustAWorker", QUEUE, vec![json!({"foo": "bar"})])
}

pub(crate) fn item(class: &str, args: Vec<Value>) -> JobItem {
    JobItem::new(class, QUEUE, args)
}

/// Config declaring `class` with `lock`, polling fast so blocking tests stay short.
pub(crate) fn config_with(class: &str, lock: LockConfiguration) -> Config {
    let mut config = Config {
        poll_interval_ms: 10,
        ..Config::default()
    };
    config.declare(class, lock);
    config
}

/// A manager over a fresh memory store, with the store handed back for
/// inspection.
pub(crate) fn manager_with(config: Config) -> (LockManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let manager = LockManager::new(store.clone(), config).unwrap();
    (manager, store)
}

/// A manager where `class` uses `lock_type` with no TTL or timeout.
pub(crate) fn manager_for(class: &str, lock_type: LockType) -> (LockManager, Arc<MemoryStore>) {
    manager_with(config_with(class, LockConfiguration::new(lock_type)))
}

pub(crate) fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// A memory store that can be taken down. While down, every call on an
/// affected key set fails with `StoreUnavailable`.
pub(crate) struct FailingStore {
    pub(crate) inner: MemoryStore,
    down: AtomicBool,
    runtime_only: bool,
}

impl FailingStore {
    /// Down for every key set.
    pub(crate) fn down() -> Self {
        Self {
            inner: MemoryStore::new(),
            down: AtomicBool::new(true),
            runtime_only: false,
        }
    }

    /// Up until [`Self::set_down`] is called.
    pub(crate) fn up() -> Self {
        Self {
            down: AtomicBool::new(false),
            ..Self::down()
        }
    }

    /// Down for runtime-scoped key sets only.
    pub(crate) fn runtime_down() -> Self {
        Self {
            runtime_only: true,
            ..Self::down()
        }
    }

    pub(crate) fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self, keys: &LockKeySet) -> Result<()> {
        let affected = !self.runtime_only || keys.scope == KeyScope::Runtime;
        if affected && self.down.load(Ordering::SeqCst) {
            return Err(UniqueJobsError::StoreUnavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

impl LockStore for FailingStore {
    fn try_acquire(
        &self,
        keys: &LockKeySet,
        metadata: &LockMetadata,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.check(keys)?;
        self.inner.try_acquire(keys, metadata, ttl)
    }

    fn release(&self, keys: &LockKeySet, token: &str) -> Result<ReleaseOutcome> {
        self.check(keys)?;
        self.inner.release(keys, token)
    }

    fn extend(&self, keys: &LockKeySet, token: &str, ttl: Duration) -> Result<bool> {
        self.check(keys)?;
        self.inner.extend(keys, token, ttl)
    }

    fn exists(&self, keys: &LockKeySet) -> Result<bool> {
        self.check(keys)?;
        self.inner.exists(keys)
    }

    fn owner(&self, keys: &LockKeySet) -> Result<Option<LockMetadata>> {
        self.check(keys)?;
        self.inner.owner(keys)
    }

    fn clear_all(&self, keys: &LockKeySet) -> Result<bool> {
        self.check(keys)?;
        self.inner.clear_all(keys)
    }
}

/// A manager for `class` with `lock_type` over `store`.
pub(crate) fn manager_over(
    store: Arc<FailingStore>,
    class: &str,
    lock_type: LockType,
) -> LockManager {
    let config = config_with(class, LockConfiguration::new(lock_type));
    LockManager::new(store, config).unwrap()
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with every event on this thread written, uncolored, to a buffer.
pub(crate) fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();

    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (value, logs)
}
