//! Lock declaration types and defaults for uniquejobs.
//!
//! This module defines the lock type enum, the unique-args selector and the
//! per-job-type [`LockConfiguration`].

use crate::error::{Result, UniqueJobsError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for `lock_ttl` and `lock_timeout` (ten years).
pub const MAX_LOCK_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// When a job type takes and gives back its uniqueness lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    /// Locked from enqueue until just before the job body runs.
    UntilExecuting,
    /// Locked only while the job body runs.
    WhileExecuting,
    /// Locked from enqueue until the job body has finished.
    UntilExecuted,
    /// Enqueue lock until execution starts, then a separate runtime lock.
    UntilAndWhileExecuting,
    /// Locked from enqueue until the TTL runs out.
    UntilTimeout,
    /// Uniqueness disabled.
    #[default]
    #[serde(rename = "none", alias = "no_lock")]
    NoLock,
}

impl LockType {
    pub const ALL: [LockType; 6] = [
        LockType::UntilExecuting,
        LockType::WhileExecuting,
        LockType::UntilExecuted,
        LockType::UntilAndWhileExecuting,
        LockType::UntilTimeout,
        LockType::NoLock,
    ];

    /// Get the configuration name for this lock type.
    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::UntilExecuting => "until_executing",
            LockType::WhileExecuting => "while_executing",
            LockType::UntilExecuted => "until_executed",
            LockType::UntilAndWhileExecuting => "until_and_while_executing",
            LockType::UntilTimeout => "until_timeout",
            LockType::NoLock => "none",
        }
    }

    /// Parse a lock type from its configuration name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "until_executing" => Some(Self::UntilExecuting),
            "while_executing" => Some(Self::WhileExecuting),
            "until_executed" => Some(Self::UntilExecuted),
            "until_and_while_executing" => Some(Self::UntilAndWhileExecuting),
            "until_timeout" => Some(Self::UntilTimeout),
            "none" | "no_lock" => Some(Self::NoLock),
            _ => None,
        }
    }

    /// Whether this lock type takes its lock when the job is pushed.
    pub fn locks_on_enqueue(&self) -> bool {
        matches!(
            self,
            LockType::UntilExecuting
                | LockType::UntilExecuted
                | LockType::UntilAndWhileExecuting
                | LockType::UntilTimeout
        )
    }

    /// Whether the lock lives under the execution-scoped (`:RUN`) keys.
    pub fn is_runtime_scoped(&self) -> bool {
        matches!(self, LockType::WhileExecuting)
    }
}

impl std::fmt::Display for LockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which job fields feed the digest.
///
/// The default selects `class`, `queue` and all of `args`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueArgs {
    /// Include the queue name. Disable for uniqueness across queues.
    pub include_queue: bool,

    /// Include the job arguments.
    pub include_args: bool,

    /// Include the scheduled time, so the same job at two times is two jobs.
    pub include_at: bool,

    /// Only these argument positions take part, in the given order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg_indices: Option<Vec<usize>>,
}

impl Default for UniqueArgs {
    fn default() -> Self {
        Self {
            include_queue: true,
            include_args: true,
            include_at: false,
            arg_indices: None,
        }
    }
}

/// Uniqueness declaration for one job type.
///
/// Immutable once the configuration has been loaded and validated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfiguration {
    /// Lock behavior.
    pub lock_type: LockType,

    /// Expiry applied to the lock keys, in seconds. Absent means the lock
    /// persists until released.
    #[serde(
        with = "duration_secs",
        alias = "lock_ttl_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub lock_ttl: Option<Duration>,

    /// How long to keep polling for the lock before treating the job as a
    /// duplicate, in seconds. Zero is non-blocking.
    #[serde(with = "duration_secs", alias = "lock_timeout_secs")]
    pub lock_timeout: Option<Duration>,

    /// Fields the digest is computed from.
    pub unique_args: UniqueArgs,

    /// Log the payload of dropped duplicates.
    pub log_duplicate: bool,
}

impl LockConfiguration {
    /// Create a configuration for the given lock type with defaults elsewhere.
    pub fn new(lock_type: LockType) -> Self {
        Self {
            lock_type,
            ..Self::default()
        }
    }

    /// Set the lock expiry.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = Some(ttl);
        self
    }

    /// Set the acquisition timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Set the digest field selector.
    pub fn with_unique_args(mut self, unique_args: UniqueArgs) -> Self {
        self.unique_args = unique_args;
        self
    }

    /// The acquisition timeout, zero when non-blocking.
    pub fn timeout(&self) -> Duration {
        self.lock_timeout.unwrap_or(Duration::ZERO)
    }

    /// Validate the declaration for job type `class`.
    ///
    /// Validation rules:
    /// - `until_timeout` requires `lock_ttl`
    /// - `lock_ttl`, when set, must be positive
    /// - `lock_ttl` and `lock_timeout` must not exceed [`MAX_LOCK_DURATION`]
    /// - `unique_args.arg_indices`, when set, must be non-empty
    pub fn validate(&self, class: &str) -> Result<()> {
        if self.lock_type == LockType::UntilTimeout && self.lock_ttl.is_none() {
            return Err(UniqueJobsError::ConfigError(format!(
                "job type '{}': until_timeout requires lock_ttl",
                class
            )));
        }

        if self.lock_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(UniqueJobsError::ConfigError(format!(
                "job type '{}': lock_ttl must be greater than 0",
                class
            )));
        }

        let bounded = [("lock_ttl", self.lock_ttl), ("lock_timeout", self.lock_timeout)];
        for (name, value) in bounded {
            if value.is_some_and(|d| d > MAX_LOCK_DURATION) {
                return Err(UniqueJobsError::ConfigError(format!(
                    "job type '{}': {} must be at most {}s",
                    class,
                    name,
                    MAX_LOCK_DURATION.as_secs()
                )));
            }
        }

        if self
            .unique_args
            .arg_indices
            .as_ref()
            .is_some_and(|indices| indices.is_empty())
        {
            return Err(UniqueJobsError::ConfigError(format!(
                "job type '{}': unique_args.arg_indices must not be empty",
                class
            )));
        }

        Ok(())
    }
}

/// Serde helper: `Option<Duration>` as (possibly fractional) seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_f64(d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        match Option::<f64>::deserialize(d)? {
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid duration {}: {}", secs, e))),
            None => Ok(None),
        }
    }
}

// Default value functions for serde
pub(crate) fn default_namespace() -> String {
    "uniquejobs".to_string()
}
pub(crate) fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}
pub(crate) fn default_pool_size() -> usize {
    5
}
pub(crate) fn default_checkout_timeout_ms() -> u64 {
    1000
}
pub(crate) fn default_command_timeout_ms() -> u64 {
    2000
}
pub(crate) fn default_poll_interval_ms() -> u64 {
    100
}
pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
pub(crate) fn default_log_format() -> String {
    "compact".to_string()
}
