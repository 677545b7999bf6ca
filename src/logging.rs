//! Logging setup for the `uniquejobs` binary.
//!
//! The library only emits `tracing` events. The binary installs a fmt
//! subscriber writing to stderr, filtered by the configured level unless
//! `RUST_LOG` is set.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line text.
    Compact,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Parse a configured format name; anything unknown is compact.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Filter for `level`, with the Redis client kept quiet.
fn build_env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directives = format!("{},redis=warn", level);
    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", directives, e))
}

/// Install the global subscriber.
///
/// Returns an error if `level` is not a valid filter or a subscriber is
/// already installed.
pub fn init_logging(level: &str, format: &str) -> anyhow::Result<()> {
    let filter = build_env_filter(level)?;

    let layer = match LogFormat::from_str(format) {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
