//! Entry point for job runners.
//!
//! A runner makes three calls per job attempt: before enqueue, before the
//! body, after the body. [`LockManager::with_lock`] is the single call for
//! each phase; [`LockManager::execute`] wraps the two execution phases
//! around a closure and guarantees the release runs on every exit path.

#[cfg(test)]
mod tests;

use crate::config::{Config, LockType};
use crate::digest::Digest;
use crate::error::Result;
use crate::job::JobItem;
use crate::keys::{LockKeySet, LockMetadata};
use crate::locks::{ExecutionGuard, LockContext, LockOutcome, Phase, UniqueLock};
use crate::store::LockStore;
use std::sync::Arc;

/// Result of [`LockManager::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution<T> {
    /// The body ran and returned this value.
    Completed(T),
    /// An equivalent job is executing; the body did not run.
    Skipped,
}

impl<T> Execution<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Execution::Skipped)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Execution::Completed(value) => Some(value),
            Execution::Skipped => None,
        }
    }
}

/// Wires job types to their lock strategies over one store.
pub struct LockManager {
    pub(crate) ctx: LockContext,
    pub(crate) config: Config,
}

impl LockManager {
    /// Create a manager over `store`.
    ///
    /// # Returns
    ///
    /// * `Ok(LockManager)` - Manager ready to use
    /// * `Err(UniqueJobsError::ConfigError)` - The configuration is invalid
    pub fn new(store: Arc<dyn LockStore>, config: Config) -> Result<Self> {
        config.validate()?;

        let ctx = LockContext {
            store,
            namespace: config.namespace.clone(),
            poll_interval: config.poll_interval(),
        };

        Ok(Self { ctx, config })
    }

    pub fn store(&self) -> &Arc<dyn LockStore> {
        &self.ctx.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The lock strategy for `item`, for runners that drive phases
    /// themselves.
    ///
    /// Stores the computed digest on `item`.
    pub fn lock_for(&self, item: &mut JobItem) -> Result<UniqueLock> {
        let lock_config = self.config.lock_config(&item.class);
        UniqueLock::new(self.ctx.clone(), item, lock_config)
    }

    /// Run the lock call for `phase`.
    ///
    /// `Duplicate` at `Enqueue` means the item must not be pushed; at
    /// `PreExecution` it means the body must not run.
    pub fn with_lock(&self, item: &mut JobItem, phase: Phase) -> Result<LockOutcome> {
        let lock = self.lock_for(item)?;
        let outcome = lock.with_lock(phase)?;

        tracing::debug!(
            class = %item.class,
            queue = %item.queue,
            jid = %item.jid,
            lock_type = %lock.lock_type(),
            phase = %phase,
            outcome = %outcome,
            "lock call"
        );

        Ok(outcome)
    }

    /// Run `body` between the pre- and post-execution lock calls.
    ///
    /// The post-execution release runs exactly once whether `body` returns
    /// or panics. A body that reports failure through its return value is
    /// released the same way.
    ///
    /// # Returns
    ///
    /// * `Ok(Execution::Completed(value))` - The body ran
    /// * `Ok(Execution::Skipped)` - An equivalent job holds the execution lock
    /// * `Err(UniqueJobsError::StoreUnavailable)` - The store failed before the
    ///   body, or during the release after it
    pub fn execute<T, F>(&self, item: &mut JobItem, body: F) -> Result<Execution<T>>
    where
        F: FnOnce(&JobItem) -> T,
    {
        let lock = self.lock_for(item)?;

        if lock.before_yield()?.is_duplicate() {
            return Ok(Execution::Skipped);
        }

        let guard = ExecutionGuard::new(&lock);
        let value = body(lock.item());
        guard.finish()?;

        Ok(Execution::Completed(value))
    }

    /// Keys of the enqueue or runtime lock `lock_type` takes for `digest`.
    pub fn key_set(&self, digest: &Digest, lock_type: LockType) -> LockKeySet {
        LockKeySet::for_digest(&self.config.namespace, digest, lock_type)
    }

    /// Owner of the lock under `keys`, if held.
    pub fn owner(&self, keys: &LockKeySet) -> Result<Option<LockMetadata>> {
        self.ctx.store.owner(keys)
    }

    /// Delete the lock under `keys` regardless of owner.
    pub fn force_clear(&self, keys: &LockKeySet) -> Result<bool> {
        let cleared = self.ctx.store.clear_all(keys)?;
        tracing::info!(lock = %keys, cleared, "forced lock clear");
        Ok(cleared)
    }
}
