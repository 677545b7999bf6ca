//! CLI argument parsing for uniquejobs.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file, read from the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "uniquejobs.yaml";

/// Uniquejobs: inspect and repair job uniqueness locks.
///
/// Locks live in Redis under `<namespace>:<digest>:EXISTS|GRABBED|VERSION`.
/// These commands compute digests, show who holds a lock, and clear locks
/// left behind by crashed workers.
#[derive(Parser, Debug)]
#[command(name = "uniquejobs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the YAML configuration file.
    ///
    /// When omitted, `uniquejobs.yaml` is used if present, else defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the digest and lock keys of a job.
    ///
    /// Uses the unique_args selector configured for the job class.
    Digest(DigestArgs),

    /// Lock inspection and repair.
    Lock(LockCommand),

    /// Configuration commands.
    Config(ConfigCommand),
}

/// Arguments for the `digest` command.
#[derive(Parser, Debug)]
pub struct DigestArgs {
    /// Job class (e.g., JustAWorker).
    #[arg(long)]
    pub class: String,

    /// Queue the job is pushed to.
    #[arg(long)]
    pub queue: String,

    /// Job arguments as a JSON array.
    #[arg(long, default_value = "[]")]
    pub args: String,

    /// Scheduled time (RFC3339).
    #[arg(long)]
    pub at: Option<String>,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Show whether a lock is held and by whom.
    Status(LockTarget),

    /// Delete a lock regardless of owner.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Which lock a lock command targets.
#[derive(Parser, Debug)]
pub struct LockTarget {
    /// Lock digest (64 hex characters).
    pub digest: String,

    /// Lock type, selects the enqueue or `:RUN` keys.
    #[arg(long, default_value = "until_executed")]
    pub lock_type: String,
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    #[command(flatten)]
    pub target: LockTarget,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

/// Config subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Available config actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Load and validate the configuration, then print it.
    Check,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
