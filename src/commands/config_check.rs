//! Implementation of the `uniquejobs config check` command.

use uniquejobs::config::Config;
use uniquejobs::error::Result;

/// The configuration was already loaded and validated by the caller; print
/// a summary and the effective YAML.
pub(super) fn cmd_config_check(config: &Config) -> Result<()> {
    println!("Configuration OK.");
    println!();
    println!("Namespace:  {}", config.namespace);
    println!("Job types:  {}", config.job_types.len());
    for (class, lock) in &config.job_types {
        println!("  {:<32} {}", class, lock.lock_type);
    }
    println!();
    print!("{}", config.to_yaml()?);

    Ok(())
}
