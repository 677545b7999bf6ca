//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration for uniquejobs.
///
/// This struct represents the contents of `uniquejobs.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Key namespace
    // =========================================================================
    /// Prefix for every lock key (default: "uniquejobs").
    #[serde(default = "default_namespace")]
    pub namespace: String,

    // =========================================================================
    // Store settings
    // =========================================================================
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Maximum number of pooled store connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// How long a store call waits for a free pooled connection.
    #[serde(default = "default_checkout_timeout_ms")]
    pub checkout_timeout_ms: u64,

    /// Read/write timeout applied to every store command.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Interval between attempts while blocking on a lock with `lock_timeout`.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Uniqueness declarations keyed by job class.
    #[serde(default)]
    pub job_types: BTreeMap<String, LockConfiguration>,

    // =========================================================================
    // Logging settings
    // =========================================================================
    /// Base tracing filter directive (e.g., "info", "uniquejobs=debug").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: "compact" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            redis_url: default_redis_url(),
            pool_size: default_pool_size(),
            checkout_timeout_ms: default_checkout_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            job_types: BTreeMap::new(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Lock declaration for a job class. Undeclared classes are not locked.
    pub fn lock_config(&self, class: &str) -> LockConfiguration {
        self.job_types.get(class).cloned().unwrap_or_default()
    }

    /// Declare (or replace) the lock configuration of a job class.
    pub fn declare(&mut self, class: impl Into<String>, lock: LockConfiguration) -> &mut Self {
        self.job_types.insert(class.into(), lock);
        self
    }

    pub fn checkout_timeout(&self) -> Duration {
        Duration::from_millis(self.checkout_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
