//! A single lock instance: one key set, one owner token.

use super::types::LockOutcome;
use crate::config::LockType;
use crate::digest::Digest;
use crate::error::{Result, UniqueJobsError};
use crate::job::JobItem;
use crate::keys::{KeyScope, LockKeySet, LockMetadata};
use crate::store::{LockStore, ReleaseOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Store handle and settings shared by every lock a manager creates.
#[derive(Clone)]
pub struct LockContext {
    pub store: Arc<dyn LockStore>,
    pub namespace: String,
    pub poll_interval: Duration,
}

/// One acquirable lock.
pub struct Lock {
    ctx: LockContext,
    keys: LockKeySet,
    token: String,
    lock_type: LockType,
    ttl: Option<Duration>,
    timeout: Duration,
}

impl Lock {
    pub(crate) fn new(
        ctx: LockContext,
        digest: &Digest,
        scope: KeyScope,
        token: &str,
        lock_type: LockType,
        ttl: Option<Duration>,
        timeout: Duration,
    ) -> Self {
        let keys = LockKeySet::with_scope(&ctx.namespace, digest, scope);
        Self {
            ctx,
            keys,
            token: token.to_string(),
            lock_type,
            ttl,
            timeout,
        }
    }

    pub fn keys(&self) -> &LockKeySet {
        &self.keys
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Try to take the lock for `item`.
    ///
    /// Non-blocking when the timeout is zero. Otherwise polls every
    /// `poll_interval` until the timeout elapses. Store errors end the wait
    /// immediately.
    pub fn acquire(&self, item: &JobItem) -> Result<LockOutcome> {
        let metadata = LockMetadata::new(&self.token, item, self.lock_type, self.ttl)?;
        let deadline = Instant::now().checked_add(self.timeout).ok_or_else(|| {
            UniqueJobsError::ConfigError(format!("lock timeout {:?} is out of range", self.timeout))
        })?;

        loop {
            if self.ctx.store.try_acquire(&self.keys, &metadata, self.ttl)? {
                tracing::debug!(lock = %self.keys, jid = %item.jid, "lock acquired");
                return Ok(LockOutcome::Acquired);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(LockOutcome::Duplicate);
            }
            std::thread::sleep(self.ctx.poll_interval.min(deadline - now));
        }
    }

    /// Release the lock if this token owns it.
    ///
    /// A lock that is gone or owned by someone else is left alone and
    /// reported as `NotOwned`. A lock held under another token is logged at
    /// error for an operator to look at.
    pub fn release(&self) -> Result<LockOutcome> {
        match self.ctx.store.release(&self.keys, &self.token)? {
            ReleaseOutcome::Released => {
                tracing::debug!(lock = %self.keys, "lock released");
                Ok(LockOutcome::Released)
            }
            ReleaseOutcome::Absent if self.ttl.is_some() => {
                tracing::warn!(
                    lock = %self.keys,
                    ttl_secs = self.ttl.map(|ttl| ttl.as_secs_f64()),
                    "lock was already gone at release, most likely expired"
                );
                Ok(LockOutcome::NotOwned)
            }
            ReleaseOutcome::Absent => {
                // Retried jobs run without a fresh enqueue lock.
                tracing::debug!(lock = %self.keys, "lock was already released");
                Ok(LockOutcome::NotOwned)
            }
            ReleaseOutcome::NotOwned => {
                tracing::error!(
                    lock = %self.keys,
                    jid = %self.token,
                    "the unique_key: {} needs to be unlocked manually",
                    self.keys.digest
                );
                Ok(LockOutcome::NotOwned)
            }
        }
    }

    /// Whether anyone holds this lock.
    pub fn is_locked(&self) -> Result<bool> {
        self.ctx.store.exists(&self.keys)
    }

    /// Reset the TTL of a lock this token owns. Returns false if not owned or
    /// the lock has no TTL.
    pub fn extend(&self) -> Result<bool> {
        match self.ttl {
            Some(ttl) => self.ctx.store.extend(&self.keys, &self.token, ttl),
            None => Ok(false),
        }
    }
}
