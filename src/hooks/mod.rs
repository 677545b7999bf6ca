//! Lifecycle hooks for removals outside the normal job flow.
//!
//! When a queued or scheduled job is deleted, or a whole queue or schedule
//! is cleared, the job never runs and never releases its enqueue lock. The
//! host calls these hooks with the removed items so the locks are cleared
//! instead of blocking new jobs until their TTL.
//!
//! Only enqueue-scoped keys of lock types that lock on enqueue are cleared.
//! A removed job never holds a `:RUN` lock.


use crate::digest::ensure_digest;
use crate::error::Result;
use crate::job::JobItem;
use crate::keys::{KeyScope, LockKeySet};
use crate::manager::LockManager;

impl LockManager {
    /// Enqueue-scoped keys `item` would hold, if its lock type takes any.
    ///
    /// Uses the digest stored on the item when present.
    pub fn enqueue_keys(&self, item: &JobItem) -> Result<Option<LockKeySet>> {
        let lock_config = self.config.lock_config(&item.class);
        if !lock_config.lock_type.locks_on_enqueue() {
            return Ok(None);
        }

        let mut item = item.clone();
        let digest = ensure_digest(&mut item, &lock_config.unique_args)?;
        Ok(Some(LockKeySet::with_scope(
            &self.config.namespace,
            &digest,
            KeyScope::Enqueue,
        )))
    }

    /// A queued job was deleted.
    pub fn on_job_removed(&self, item: &JobItem) -> Result<bool> {
        self.clear_removed(item, "job removed")
    }

    /// A scheduled job was deleted.
    pub fn on_scheduled_job_removed(&self, item: &JobItem) -> Result<bool> {
        self.clear_removed(item, "scheduled job removed")
    }

    /// A queue was cleared. Returns how many locks were deleted.
    pub fn on_queue_cleared(&self, items: &[JobItem]) -> Result<usize> {
        self.clear_removed_many(items, "queue cleared")
    }

    /// The schedule was cleared. Returns how many locks were deleted.
    pub fn on_schedule_cleared(&self, items: &[JobItem]) -> Result<usize> {
        self.clear_removed_many(items, "schedule cleared")
    }

    fn clear_removed(&self, item: &JobItem, reason: &str) -> Result<bool> {
        let Some(keys) = self.enqueue_keys(item)? else {
            return Ok(false);
        };

        let cleared = self.ctx.store.clear_all(&keys)?;
        tracing::debug!(
            digest = %keys.digest,
            class = %item.class,
            jid = %item.jid,
            cleared,
            "{}",
            reason
        );
        Ok(cleared)
    }

    fn clear_removed_many(&self, items: &[JobItem], reason: &str) -> Result<usize> {
        let mut key_sets = Vec::new();
        for item in items {
            if let Some(keys) = self.enqueue_keys(item)?
                && !key_sets.contains(&keys)
            {
                key_sets.push(keys);
            }
        }

        let cleared = self.ctx.store.clear_many(&key_sets)?;
        tracing::info!(items = items.len(), cleared, "{}", reason);
        Ok(cleared)
    }
}
