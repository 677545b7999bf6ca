//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{Result, UniqueJobsError};
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(UniqueJobsError::ConfigError)` - Read, parse or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            UniqueJobsError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as null rather than an empty map.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                UniqueJobsError::ConfigError(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            UniqueJobsError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and every job type declaration.
    ///
    /// Validation rules:
    /// - `namespace` must be non-empty and must not contain ':'
    /// - `pool_size`, timeouts and `poll_interval_ms` must be positive
    /// - each job type must pass [`super::LockConfiguration::validate`]
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() || self.namespace.contains(':') {
            return Err(UniqueJobsError::ConfigError(format!(
                "config validation failed: namespace '{}' must be non-empty and contain no ':'",
                self.namespace
            )));
        }

        let positive = [
            ("pool_size", self.pool_size as u64),
            ("checkout_timeout_ms", self.checkout_timeout_ms),
            ("command_timeout_ms", self.command_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(UniqueJobsError::ConfigError(format!(
                    "config validation failed: {} must be greater than 0",
                    name
                )));
            }
        }

        for (class, lock) in &self.job_types {
            lock.validate(class)?;
        }

        Ok(())
    }
}
