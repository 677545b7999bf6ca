//! Store adapter for uniquejobs.
//!
//! [`LockStore`] is the small set of atomic primitives the lock strategies
//! are built from. Every operation either completes atomically in the store
//! or fails with [`crate::error::UniqueJobsError::StoreUnavailable`]; a store
//! failure is never reported as a lock acquired or released.
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-process map with lazy TTL expiry (tests, single node)
//! - [`RedisStore`]: Redis with Lua scripts for the conditional operations,
//!   each call on a connection checked out of a bounded [`ConnectionPool`]

mod memory;
mod pool;
mod redis;


pub use self::memory::MemoryStore;
pub use self::pool::{ConnectionPool, PoolStatus};
pub use self::redis::RedisStore;

use crate::error::Result;
use crate::keys::{LockKeySet, LockMetadata};
use std::time::Duration;

/// What a conditional release found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The caller owned the lock and its keys were deleted.
    Released,
    /// No lock was present (already released, cleared, or expired).
    Absent,
    /// The lock is held by a different token; nothing was deleted.
    NotOwned,
}

impl ReleaseOutcome {
    /// Whether the keys were actually deleted.
    pub fn is_released(&self) -> bool {
        matches!(self, ReleaseOutcome::Released)
    }
}

/// Atomic lock primitives over a key-value store.
pub trait LockStore: Send + Sync {
    /// Take the lock if no current-version lock exists.
    ///
    /// Sets the existence key to `metadata.token`, the owner key to the
    /// encoded metadata and the version key to [`crate::keys::LOCK_VERSION`],
    /// all with `ttl` when given, in one atomic step.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The lock was taken
    /// * `Ok(false)` - The lock is already held (duplicate)
    fn try_acquire(
        &self,
        keys: &LockKeySet,
        metadata: &LockMetadata,
        ttl: Option<Duration>,
    ) -> Result<bool>;

    /// Delete the lock only if both the existence and owner keys carry `token`.
    fn release(&self, keys: &LockKeySet, token: &str) -> Result<ReleaseOutcome>;

    /// Reset the TTL of a lock owned by `token`. Returns false if not owned.
    fn extend(&self, keys: &LockKeySet, token: &str, ttl: Duration) -> Result<bool>;

    /// Whether the lock is held by anyone.
    fn exists(&self, keys: &LockKeySet) -> Result<bool>;

    /// Metadata of the current owner, if the lock is held.
    fn owner(&self, keys: &LockKeySet) -> Result<Option<LockMetadata>>;

    /// Delete the lock regardless of owner. Returns whether anything was deleted.
    ///
    /// Only for forced releases (lifecycle hooks, operator intervention).
    fn clear_all(&self, keys: &LockKeySet) -> Result<bool>;

    /// Forced release of many locks. Returns how many locks had keys to delete.
    fn clear_many(&self, keys: &[LockKeySet]) -> Result<usize> {
        let mut cleared = 0;
        for key_set in keys {
            if self.clear_all(key_set)? {
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}
