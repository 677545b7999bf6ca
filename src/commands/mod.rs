//! Command implementations for uniquejobs.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod config_check;
mod digest;
mod lock;

use crate::cli::{Command, ConfigAction, DEFAULT_CONFIG_PATH, LockAction};
use std::path::Path;
use std::sync::Arc;
use uniquejobs::config::Config;
use uniquejobs::error::Result;
use uniquejobs::manager::LockManager;
use uniquejobs::store::RedisStore;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Digest(args) => digest::cmd_digest(&config, args),
        Command::Lock(lock_cmd) => {
            let manager = redis_manager(config)?;
            match lock_cmd.action {
                LockAction::Status(target) => lock::cmd_lock_status(&manager, target),
                LockAction::Clear(args) => lock::cmd_lock_clear(&manager, args),
            }
        }
        Command::Config(config_cmd) => match config_cmd.action {
            ConfigAction::Check => config_check::cmd_config_check(&config),
        },
    }
}

/// Load the configuration named on the command line, or the default file if
/// it exists, or built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH),
        None => Ok(Config::default()),
    }
}

fn redis_manager(config: Config) -> Result<LockManager> {
    let store = RedisStore::new(&config)?;
    LockManager::new(Arc::new(store), config)
}
