//! Implementation of the `uniquejobs digest` command.

use crate::cli::DigestArgs;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uniquejobs::config::Config;
use uniquejobs::digest::{canonical_payload, digest};
use uniquejobs::error::{Result, UniqueJobsError};
use uniquejobs::job::JobItem;
use uniquejobs::keys::LockKeySet;

/// Build the job item described by the command arguments.
pub(super) fn build_item(args: &DigestArgs) -> Result<JobItem> {
    let parsed: Value = serde_json::from_str(&args.args).map_err(|e| {
        UniqueJobsError::UserError(format!("--args is not valid JSON: {}", e))
    })?;
    let Value::Array(job_args) = parsed else {
        return Err(UniqueJobsError::UserError(
            "--args must be a JSON array".to_string(),
        ));
    };

    let mut item = JobItem::new(&args.class, &args.queue, job_args);
    if let Some(at) = &args.at {
        let at = DateTime::parse_from_rfc3339(at).map_err(|e| {
            UniqueJobsError::UserError(format!("--at is not an RFC3339 timestamp: {}", e))
        })?;
        item = item.with_at(at.with_timezone(&Utc));
    }

    Ok(item)
}

pub(super) fn cmd_digest(config: &Config, args: DigestArgs) -> Result<()> {
    let item = build_item(&args)?;
    let lock_config = config.lock_config(&item.class);
    let digest = digest(&item, &lock_config.unique_args);

    println!("Digest:     {}", digest);
    println!("Lock type:  {}", lock_config.lock_type);
    println!("Payload:    {}", canonical_payload(&item, &lock_config.unique_args));

    if lock_config.lock_type.locks_on_enqueue() || lock_config.lock_type.is_runtime_scoped() {
        let keys = LockKeySet::for_digest(&config.namespace, &digest, lock_config.lock_type);
        println!("Keys:");
        for key in keys.all() {
            println!("  {}", key);
        }
    } else {
        println!("Keys:       (none, class is not locked)");
    }

    Ok(())
}
