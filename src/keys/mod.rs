//! Key namespace for uniquejobs.
//!
//! Every lock is a set of three store keys derived from a digest:
//!
//! - `<ns>:<digest>:EXISTS` - present while the lock is held; holds the owner token
//! - `<ns>:<digest>:GRABBED` - the owner key; holds the encoded [`LockMetadata`]
//! - `<ns>:<digest>:VERSION` - the lock-format generation the keys were written with
//!
//! Execution-scoped locks (while-executing, and the runtime half of
//! until-and-while-executing) insert a `:RUN` segment after the digest so they
//! never collide with the enqueue-scoped lock of the same job.

mod metadata;

#[cfg(test)]
mod tests;

pub use metadata::LockMetadata;

use crate::config::LockType;
use crate::digest::Digest;

/// Generation written to the version key. Key sets carrying any other value
/// are stale and are replaced by the next acquire.
pub const LOCK_VERSION: &str = "1";

/// Which lock of a job a key set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyScope {
    /// Held from enqueue.
    Enqueue,
    /// Held while the job body runs.
    Runtime,
}

impl KeyScope {
    /// Scope used by a lock type's own lock.
    pub fn for_lock_type(lock_type: LockType) -> Self {
        if lock_type.is_runtime_scoped() {
            KeyScope::Runtime
        } else {
            KeyScope::Enqueue
        }
    }
}

/// The store keys of one lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKeySet {
    /// The digest the keys were derived from.
    pub digest: Digest,

    /// The lock these keys belong to.
    pub scope: KeyScope,

    /// Existence key.
    pub exists: String,

    /// Owner key.
    pub grabbed: String,

    /// Version key.
    pub version: String,
}

impl LockKeySet {
    /// Keys for the lock a job type of `lock_type` takes.
    pub fn for_digest(namespace: &str, digest: &Digest, lock_type: LockType) -> Self {
        Self::with_scope(namespace, digest, KeyScope::for_lock_type(lock_type))
    }

    /// Keys for an explicit scope.
    pub fn with_scope(namespace: &str, digest: &Digest, scope: KeyScope) -> Self {
        let base = match scope {
            KeyScope::Enqueue => format!("{}:{}", namespace, digest),
            KeyScope::Runtime => format!("{}:{}:RUN", namespace, digest),
        };

        Self {
            digest: digest.clone(),
            scope,
            exists: format!("{}:EXISTS", base),
            grabbed: format!("{}:GRABBED", base),
            version: format!("{}:VERSION", base),
        }
    }

    /// All three keys, existence key first.
    pub fn all(&self) -> [&str; 3] {
        [&self.exists, &self.grabbed, &self.version]
    }
}

impl std::fmt::Display for LockKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.exists.strip_suffix(":EXISTS") {
            Some(base) => f.write_str(base),
            None => f.write_str(&self.exists),
        }
    }
}
