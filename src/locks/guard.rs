//! RAII guard for the post-execution release.

use super::strategy::UniqueLock;
use super::types::LockOutcome;
use crate::error::Result;

/// Runs the post-execution unlock of a [`UniqueLock`] exactly once.
///
/// Call [`ExecutionGuard::finish`] to release and see the result. If the
/// guard is dropped instead (early return, `?`, panic), the release runs in
/// `Drop` and failures are logged.
pub struct ExecutionGuard<'a> {
    lock: &'a UniqueLock,
    released: bool,
}

impl<'a> ExecutionGuard<'a> {
    pub(crate) fn new(lock: &'a UniqueLock) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    pub fn lock(&self) -> &UniqueLock {
        self.lock
    }

    /// Release now and report the outcome.
    pub fn finish(mut self) -> Result<LockOutcome> {
        self.released = true;
        self.lock.after_yield()
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Err(e) = self.lock.after_yield() {
            tracing::error!(
                digest = ?self.lock.digest().map(|d| d.as_str()),
                jid = %self.lock.item().jid,
                error = %e,
                "failed to release lock after execution"
            );
        }
    }
}
