//! Configuration model for uniquejobs.
//!
//! This module defines the Config struct that represents `uniquejobs.yaml`:
//! store settings plus one [`LockConfiguration`] per job type. It supports
//! forward-compatible YAML parsing (unknown fields are ignored), sensible
//! defaults for optional fields, and fail-fast validation of job type
//! declarations.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use types::{LockConfiguration, LockType, MAX_LOCK_DURATION, UniqueArgs};
