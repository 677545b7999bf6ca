//! Lifecycle phases and lock outcomes.

/// The point in a job's life a lock call is made at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the job is pushed to a queue or schedule.
    Enqueue,
    /// Before the job body runs.
    PreExecution,
    /// After the job body returned, failed or panicked.
    PostExecution,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Enqueue => "enqueue",
            Phase::PreExecution => "pre_execution",
            Phase::PostExecution => "post_execution",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a lock call. `Duplicate` is an ordinary outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// The lock was taken; the runner proceeds.
    Acquired,
    /// An equivalent job holds the lock; the runner drops this job.
    Duplicate,
    /// The caller's lock was released.
    Released,
    /// The lock to release was gone or held by another owner. Logged, and the
    /// runner still proceeds.
    NotOwned,
    /// The lock type does nothing in this phase.
    Untouched,
}

impl LockOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, LockOutcome::Duplicate)
    }

    /// Whether the runner should go on with the job.
    pub fn should_proceed(&self) -> bool {
        !self.is_duplicate()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockOutcome::Acquired => "acquired",
            LockOutcome::Duplicate => "duplicate",
            LockOutcome::Released => "released",
            LockOutcome::NotOwned => "not_owned",
            LockOutcome::Untouched => "untouched",
        }
    }
}

impl std::fmt::Display for LockOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
