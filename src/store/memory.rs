//! In-memory lock store.
//!
//! A single mutex over a key map gives the same atomicity the Redis scripts
//! give. Expired keys are dropped lazily whenever they are looked at.

use super::{LockStore, ReleaseOutcome};
use crate::error::Result;
use crate::keys::{LOCK_VERSION, LockKeySet, LockMetadata};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-memory lock store (for tests and single-process use).
///
/// ## Limitations
/// - Not persistent (locks lost on restart)
/// - Not shared between processes
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// All live keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut entries = self.entries();
        entries.retain(|_, entry| entry.is_live(now));

        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Read a raw key.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        let mut entries = self.entries();
        live(&mut entries, key, Instant::now()).map(|entry| entry.value.clone())
    }

    /// Write a raw key with no TTL, bypassing the lock protocol.
    pub fn set_raw(&self, key: &str, value: &str) {
        self.entries().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
    }
}

/// Look up `key`, dropping it first if it has expired.
fn live<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a Entry> {
    if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
        entries.remove(key);
    }
    entries.get(key)
}

fn owned_by(entries: &mut HashMap<String, Entry>, keys: &LockKeySet, token: &str) -> bool {
    let now = Instant::now();
    let exists_matches = live(entries, &keys.exists, now).is_some_and(|e| e.value == token);
    let grabbed_matches = live(entries, &keys.grabbed, now)
        .and_then(|e| LockMetadata::decode(&e.value).ok())
        .is_some_and(|meta| meta.token == token);

    exists_matches && grabbed_matches
}

impl LockStore for MemoryStore {
    fn try_acquire(
        &self,
        keys: &LockKeySet,
        metadata: &LockMetadata,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let payload = metadata.encode()?;
        let now = Instant::now();
        let mut entries = self.entries();

        if live(&mut entries, &keys.exists, now).is_some() {
            let current = live(&mut entries, &keys.version, now)
                .is_some_and(|e| e.value == LOCK_VERSION);
            if current {
                return Ok(false);
            }
            for key in keys.all() {
                entries.remove(key);
            }
        }

        let expires_at = ttl.map(|ttl| now + ttl);
        let values = [metadata.token.as_str(), payload.as_str(), LOCK_VERSION];
        for (key, value) in keys.all().into_iter().zip(values) {
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at,
                },
            );
        }

        Ok(true)
    }

    fn release(&self, keys: &LockKeySet, token: &str) -> Result<ReleaseOutcome> {
        let now = Instant::now();
        let mut entries = self.entries();

        let exists = live(&mut entries, &keys.exists, now).is_some();
        let grabbed = live(&mut entries, &keys.grabbed, now).is_some();
        if !exists && !grabbed {
            return Ok(ReleaseOutcome::Absent);
        }

        if !owned_by(&mut entries, keys, token) {
            return Ok(ReleaseOutcome::NotOwned);
        }

        for key in keys.all() {
            entries.remove(key);
        }
        Ok(ReleaseOutcome::Released)
    }

    fn extend(&self, keys: &LockKeySet, token: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries();
        if !owned_by(&mut entries, keys, token) {
            return Ok(false);
        }

        let expires_at = Some(Instant::now() + ttl);
        for key in keys.all() {
            if let Some(entry) = entries.get_mut(key) {
                entry.expires_at = expires_at;
            }
        }
        Ok(true)
    }

    fn exists(&self, keys: &LockKeySet) -> Result<bool> {
        let mut entries = self.entries();
        Ok(live(&mut entries, &keys.exists, Instant::now()).is_some())
    }

    fn owner(&self, keys: &LockKeySet) -> Result<Option<LockMetadata>> {
        let mut entries = self.entries();
        match live(&mut entries, &keys.grabbed, Instant::now()) {
            Some(entry) => LockMetadata::decode(&entry.value).map(Some),
            None => Ok(None),
        }
    }

    fn clear_all(&self, keys: &LockKeySet) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries();

        let mut removed = false;
        for key in keys.all() {
            if let Some(entry) = entries.remove(key) {
                removed |= entry.is_live(now);
            }
        }
        Ok(removed)
    }
}
