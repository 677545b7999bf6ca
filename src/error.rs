//! Error types for uniquejobs.
//!
//! Uses thiserror for derive macros. A duplicate job is not an error: it is
//! reported as [`crate::locks::LockOutcome::Duplicate`].

use crate::exit_codes;
use thiserror::Error;

/// Main error type for uniquejobs operations.
#[derive(Error, Debug)]
pub enum UniqueJobsError {
    /// The store could not be reached, timed out, or the pool was exhausted.
    /// Transient: callers decide whether to retry.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A lock was held by a different token than the one releasing it.
    #[error("Lock not owned: {0}")]
    LockNotOwned(String),

    /// A digest stored on a job item is not a well-formed digest.
    #[error("Digest mismatch: {0}")]
    DigestMismatch(String),

    /// Invalid job type declaration or store settings.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Lock metadata or job payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// User provided invalid arguments.
    #[error("{0}")]
    UserError(String),
}

impl UniqueJobsError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            UniqueJobsError::StoreUnavailable(_) => exit_codes::STORE_FAILURE,
            UniqueJobsError::LockNotOwned(_) => exit_codes::LOCK_FAILURE,
            UniqueJobsError::DigestMismatch(_) => exit_codes::LOCK_FAILURE,
            UniqueJobsError::ConfigError(_) => exit_codes::CONFIG_ERROR,
            UniqueJobsError::Serialization(_) => exit_codes::USER_ERROR,
            UniqueJobsError::UserError(_) => exit_codes::USER_ERROR,
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, UniqueJobsError::StoreUnavailable(_))
    }
}

impl From<redis::RedisError> for UniqueJobsError {
    fn from(err: redis::RedisError) -> Self {
        UniqueJobsError::StoreUnavailable(format!("Redis error: {}", err))
    }
}

impl From<serde_json::Error> for UniqueJobsError {
    fn from(err: serde_json::Error) -> Self {
        UniqueJobsError::Serialization(err.to_string())
    }
}

/// Result type alias for uniquejobs operations.
pub type Result<T> = std::result::Result<T, UniqueJobsError>;
