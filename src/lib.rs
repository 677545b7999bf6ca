//! Uniquejobs: uniqueness locks for asynchronous jobs.
//!
//! Given a job (class, queue, arguments, optional schedule time), guarantees
//! that at most one equivalent job is queued, scheduled or executing at a
//! time, coordinating through a shared key-value store.
//!
//! A job runner creates one [`manager::LockManager`] over a
//! [`store::LockStore`] and calls it at each lifecycle phase:
//!
//! - [`manager::LockManager::with_lock`] with [`locks::Phase::Enqueue`] before
//!   pushing a job; a [`locks::LockOutcome::Duplicate`] means drop it
//! - [`manager::LockManager::execute`] around the job body
//! - the hooks in [`hooks`] when jobs are deleted outside the normal flow

pub mod config;
pub mod digest;
pub mod error;
pub mod exit_codes;
pub mod hooks;
pub mod job;
pub mod keys;
pub mod locks;
pub mod logging;
pub mod manager;
pub mod store;

#[cfg(test)]
mod test_support;
