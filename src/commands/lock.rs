//! Implementation of the `uniquejobs lock` commands.

use crate::cli::{LockClearArgs, LockTarget};
use uniquejobs::config::LockType;
use uniquejobs::digest::Digest;
use uniquejobs::error::{Result, UniqueJobsError};
use uniquejobs::keys::{LockKeySet, LockMetadata};
use uniquejobs::manager::LockManager;
use uniquejobs::store::LockStore;

/// Resolve the key set a lock command targets.
pub(super) fn resolve_target(manager: &LockManager, target: &LockTarget) -> Result<LockKeySet> {
    let digest = Digest::parse(&target.digest)
        .map_err(|e| UniqueJobsError::UserError(e.to_string()))?;

    let lock_type = LockType::from_str(&target.lock_type).ok_or_else(|| {
        UniqueJobsError::UserError(format!(
            "unknown lock type '{}' (expected one of: {})",
            target.lock_type,
            LockType::ALL
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;

    if lock_type == LockType::NoLock {
        return Err(UniqueJobsError::UserError(
            "lock type 'none' has no keys".to_string(),
        ));
    }

    Ok(manager.key_set(&digest, lock_type))
}

fn print_metadata(metadata: &LockMetadata) {
    println!("  Owner:      {}", metadata.owner);
    if let Some(pid) = metadata.pid {
        println!("  PID:        {}", pid);
    }
    println!("  Job:        {} ({})", metadata.class, metadata.jid);
    println!("  Queue:      {}", metadata.queue);
    println!("  Lock type:  {}", metadata.lock_type);
    println!("  Created:    {}", metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Age:        {}", metadata.age_string());
    match metadata.remaining_ttl() {
        Some(ttl) => println!("  Expires in: {}s", ttl.num_seconds()),
        None => println!("  Expires in: never (must be released or cleared)"),
    }
}

pub(super) fn cmd_lock_status(manager: &LockManager, target: LockTarget) -> Result<()> {
    let keys = resolve_target(manager, &target)?;

    if !manager.store().exists(&keys)? {
        println!("Lock {} is not held.", keys);
        return Ok(());
    }

    println!("Lock {} is held.", keys);
    match manager.owner(&keys) {
        Ok(Some(metadata)) => print_metadata(&metadata),
        Ok(None) => println!("  Owner key is missing; the lock can only expire or be cleared."),
        Err(UniqueJobsError::Serialization(e)) => {
            println!("  Owner key is unreadable ({}).", e);
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

pub(super) fn cmd_lock_clear(manager: &LockManager, args: LockClearArgs) -> Result<()> {
    // Require --force flag
    if !args.force {
        return Err(UniqueJobsError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock lets an equivalent job run while the holder may still be active.\n\
             Only clear locks whose holder has crashed or whose job was deleted.\n\n\
             To clear the lock, run:\n  uniquejobs lock clear {} --lock-type {} --force",
            args.target.digest, args.target.lock_type
        )));
    }

    let keys = resolve_target(manager, &args.target)?;
    let previous = manager.owner(&keys).ok().flatten();

    if !manager.force_clear(&keys)? {
        println!("Lock {} was not held.", keys);
        return Ok(());
    }

    println!("Cleared lock: {}", keys);
    if let Some(metadata) = previous {
        println!();
        println!("Lock details:");
        print_metadata(&metadata);
    }

    Ok(())
}
