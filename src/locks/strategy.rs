//! Per-job lock strategies.

use super::lock::{Lock, LockContext};
use super::types::{LockOutcome, Phase};
use crate::config::{LockConfiguration, LockType};
use crate::digest::{Digest, ensure_digest};
use crate::error::{Result, UniqueJobsError};
use crate::job::JobItem;
use crate::keys::{KeyScope, LockKeySet};
use std::sync::OnceLock;

/// The lock behavior of one lock type, with its per-variant state.
pub enum Strategy {
    UntilExecuting(Lock),
    WhileExecuting(Lock),
    UntilExecuted(Lock),
    /// The enqueue lock, plus a runtime lock built on first use.
    UntilAndWhileExecuting {
        lock: Lock,
        runtime: OnceLock<Lock>,
    },
    UntilTimeout(Lock),
    NoLock,
}

/// The lock of one job item, driven through its lifecycle phases.
pub struct UniqueLock {
    ctx: LockContext,
    item: JobItem,
    config: LockConfiguration,
    digest: Option<Digest>,
    strategy: Strategy,
}

impl UniqueLock {
    /// Build the strategy for `item` under `config`.
    ///
    /// Computes and stores the item's digest unless the lock type is
    /// `none`. A digest already on the item is reused.
    pub(crate) fn new(
        ctx: LockContext,
        item: &mut JobItem,
        config: LockConfiguration,
    ) -> Result<Self> {
        if config.lock_type == LockType::NoLock {
            return Ok(Self {
                ctx,
                item: item.clone(),
                config,
                digest: None,
                strategy: Strategy::NoLock,
            });
        }

        let digest = ensure_digest(item, &config.unique_args)?;
        let primary = Lock::new(
            ctx.clone(),
            &digest,
            KeyScope::for_lock_type(config.lock_type),
            &item.jid,
            config.lock_type,
            config.lock_ttl,
            config.timeout(),
        );

        let strategy = match config.lock_type {
            LockType::UntilExecuting => Strategy::UntilExecuting(primary),
            LockType::WhileExecuting => Strategy::WhileExecuting(primary),
            LockType::UntilExecuted => Strategy::UntilExecuted(primary),
            LockType::UntilAndWhileExecuting => Strategy::UntilAndWhileExecuting {
                lock: primary,
                runtime: OnceLock::new(),
            },
            LockType::UntilTimeout => Strategy::UntilTimeout(primary),
            LockType::NoLock => Strategy::NoLock,
        };

        Ok(Self {
            ctx,
            item: item.clone(),
            config,
            digest: Some(digest),
            strategy,
        })
    }

    pub fn lock_type(&self) -> LockType {
        self.config.lock_type
    }

    /// The item's digest; `None` for lock type `none`.
    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    pub fn item(&self) -> &JobItem {
        &self.item
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Keys of the primary lock, if the lock type takes one.
    pub fn keys(&self) -> Option<&LockKeySet> {
        self.primary().map(Lock::keys)
    }

    fn primary(&self) -> Option<&Lock> {
        match &self.strategy {
            Strategy::UntilExecuting(lock)
            | Strategy::WhileExecuting(lock)
            | Strategy::UntilExecuted(lock)
            | Strategy::UntilAndWhileExecuting { lock, .. }
            | Strategy::UntilTimeout(lock) => Some(lock),
            Strategy::NoLock => None,
        }
    }

    fn runtime_lock(&self) -> Option<&Lock> {
        match &self.strategy {
            Strategy::UntilAndWhileExecuting { lock, runtime } => Some(runtime.get_or_init(|| {
                Lock::new(
                    self.ctx.clone(),
                    &lock.keys().digest,
                    KeyScope::Runtime,
                    lock.token(),
                    LockType::WhileExecuting,
                    self.config.lock_ttl,
                    self.config.timeout(),
                )
            })),
            _ => None,
        }
    }

    /// Keys of the runtime lock of until-and-while-executing.
    pub fn runtime_keys(&self) -> Option<&LockKeySet> {
        self.runtime_lock().map(Lock::keys)
    }

    /// Run the lock call for `phase`.
    pub fn with_lock(&self, phase: Phase) -> Result<LockOutcome> {
        match phase {
            Phase::Enqueue => self.before_enqueue(),
            Phase::PreExecution => self.before_yield(),
            Phase::PostExecution => self.after_yield(),
        }
    }

    /// Called before the item is pushed.
    pub fn before_enqueue(&self) -> Result<LockOutcome> {
        match &self.strategy {
            Strategy::UntilExecuting(lock)
            | Strategy::UntilExecuted(lock)
            | Strategy::UntilAndWhileExecuting { lock, .. }
            | Strategy::UntilTimeout(lock) => self.acquire(lock, Phase::Enqueue),
            Strategy::WhileExecuting(_) | Strategy::NoLock => Ok(LockOutcome::Untouched),
        }
    }

    /// Called right before the body runs.
    ///
    /// `Duplicate` means another instance is executing and the body must not
    /// run.
    pub fn before_yield(&self) -> Result<LockOutcome> {
        match &self.strategy {
            Strategy::UntilExecuting(lock) => lock.release(),
            Strategy::WhileExecuting(lock) => self.acquire(lock, Phase::PreExecution),
            Strategy::UntilAndWhileExecuting { lock, .. } => {
                lock.release()?;
                match self.runtime_lock() {
                    Some(runtime) => self.acquire(runtime, Phase::PreExecution),
                    None => Ok(LockOutcome::Untouched),
                }
            }
            Strategy::UntilExecuted(_) | Strategy::UntilTimeout(_) | Strategy::NoLock => {
                Ok(LockOutcome::Untouched)
            }
        }
    }

    /// Called after the body returned, failed or panicked.
    pub fn after_yield(&self) -> Result<LockOutcome> {
        self.unlock(Phase::PostExecution)
    }

    /// Release whatever this item holds for `phase`.
    ///
    /// For `Enqueue` this is the lock taken by [`Self::before_enqueue`], for
    /// runners whose push failed after locking. For the execution phases it
    /// is the lock held across the body. Until-timeout locks are never
    /// released; they expire.
    pub fn unlock(&self, phase: Phase) -> Result<LockOutcome> {
        match (&self.strategy, phase) {
            (Strategy::UntilTimeout(_) | Strategy::NoLock, _) => Ok(LockOutcome::Untouched),
            (Strategy::WhileExecuting(_), Phase::Enqueue) => Ok(LockOutcome::Untouched),
            (
                Strategy::UntilExecuting(lock)
                | Strategy::UntilExecuted(lock)
                | Strategy::UntilAndWhileExecuting { lock, .. },
                Phase::Enqueue,
            ) => lock.release(),
            (Strategy::UntilExecuting(_), _) => Ok(LockOutcome::Untouched),
            (Strategy::WhileExecuting(lock) | Strategy::UntilExecuted(lock), _) => {
                lock.release()
            }
            (Strategy::UntilAndWhileExecuting { .. }, _) => match self.runtime_lock() {
                Some(runtime) => runtime.release(),
                None => Ok(LockOutcome::Untouched),
            },
        }
    }

    /// Reset the TTL of the lock held across the body, for jobs that may
    /// outlive it.
    ///
    /// Does nothing for lock types without an execution lock or without a
    /// TTL. Fails with `LockNotOwned` if the lock expired or was taken over.
    pub fn extend(&self) -> Result<()> {
        if self.config.lock_ttl.is_none() {
            return Ok(());
        }

        let lock = match &self.strategy {
            Strategy::WhileExecuting(lock) | Strategy::UntilExecuted(lock) => lock,
            Strategy::UntilAndWhileExecuting { .. } => match self.runtime_lock() {
                Some(runtime) => runtime,
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        if lock.extend()? {
            Ok(())
        } else {
            Err(UniqueJobsError::LockNotOwned(lock.keys().to_string()))
        }
    }

    /// Whether the primary lock is currently held by anyone.
    pub fn locked(&self) -> Result<bool> {
        match self.primary() {
            Some(lock) => lock.is_locked(),
            None => Ok(false),
        }
    }

    fn acquire(&self, lock: &Lock, phase: Phase) -> Result<LockOutcome> {
        let outcome = lock.acquire(&self.item)?;
        if outcome.is_duplicate() {
            self.log_duplicate(lock, phase);
        }
        Ok(outcome)
    }

    fn log_duplicate(&self, lock: &Lock, phase: Phase) {
        if self.config.log_duplicate {
            tracing::warn!(
                digest = %lock.keys().digest,
                class = %self.item.class,
                queue = %self.item.queue,
                lock_type = %self.config.lock_type,
                jid = %self.item.jid,
                phase = %phase,
                args = %serde_json::Value::Array(self.item.args.clone()),
                "dropping duplicate job"
            );
        } else {
            tracing::debug!(
                digest = %lock.keys().digest,
                class = %self.item.class,
                lock_type = %self.config.lock_type,
                jid = %self.item.jid,
                phase = %phase,
                "dropping duplicate job"
            );
        }
    }
}
