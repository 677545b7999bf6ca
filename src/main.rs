//! Uniquejobs: operator CLI for job uniqueness locks.
//!
//! This is the main entry point for the `uniquejobs` CLI. It parses
//! arguments, loads configuration, sets up logging, dispatches to the
//! appropriate command handler, and handles errors with proper exit codes.

mod cli;
mod commands;

use cli::Cli;
use std::process::ExitCode;
use uniquejobs::{exit_codes, logging};

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::from(err.exit_code() as u8);
        }
    };

    if let Err(err) = logging::init_logging(&config.log_level, &config.log_format) {
        eprintln!("Warning: {}", err);
    }

    match commands::dispatch(cli.command, config) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
