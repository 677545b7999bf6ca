//! Lock metadata stored at the owner key.

use crate::config::LockType;
use crate::error::{Result, UniqueJobsError};
use crate::job::JobItem;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lock metadata stored at a lock's owner key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Acquisition token; only this token may release the lock.
    pub token: String,

    /// Id of the job that took the lock.
    pub jid: String,

    /// Job class.
    pub class: String,

    /// Job queue.
    pub queue: String,

    /// Lock type the job was declared with.
    pub lock_type: LockType,

    /// Host and user of the process that took the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lock holder (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// When the lock was taken.
    pub created_at: DateTime<Utc>,

    /// When the lock expires, if it has a TTL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl LockMetadata {
    /// Create metadata for `item` taking a lock with `token` and optional `ttl`.
    ///
    /// Fails with `ConfigError` if the TTL puts the expiry past what a
    /// timestamp can hold.
    pub fn new(
        token: &str,
        item: &JobItem,
        lock_type: LockType,
        ttl: Option<std::time::Duration>,
    ) -> Result<Self> {
        let created_at = Utc::now();
        let expires_at = ttl
            .map(|ttl| {
                Duration::from_std(ttl)
                    .ok()
                    .and_then(|ttl| created_at.checked_add_signed(ttl))
                    .ok_or_else(|| {
                        UniqueJobsError::ConfigError(format!("lock ttl {:?} is out of range", ttl))
                    })
            })
            .transpose()?;

        Ok(Self {
            token: token.to_string(),
            jid: item.jid.clone(),
            class: item.class.clone(),
            queue: item.queue.clone(),
            lock_type,
            owner: get_owner_string(),
            pid: Some(std::process::id()),
            created_at,
            expires_at,
        })
    }

    /// Encode the metadata as the JSON payload stored in the store.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            UniqueJobsError::Serialization(format!("failed to encode lock metadata: {}", e))
        })
    }

    /// Decode metadata read back from the store.
    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| {
            UniqueJobsError::Serialization(format!("failed to decode lock metadata: {}", e))
        })
    }

    /// Calculate the age of the lock.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Time left before the TTL expires, `None` when the lock has no TTL.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.signed_duration_since(Utc::now()).max(Duration::zero()))
    }
}

/// Get the owner string for lock metadata.
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
