//! Lock strategies for uniquejobs.
//!
//! A [`UniqueLock`] is built per job item and driven through three phases by
//! the job runner:
//!
//! - before enqueue ([`UniqueLock::before_enqueue`])
//! - before the body runs ([`UniqueLock::before_yield`])
//! - after the body returned, failed or panicked ([`UniqueLock::after_yield`])
//!
//! Which phases touch the store depends on the lock type:
//!
//! | Lock type | Acquired | Released |
//! |---|---|---|
//! | `until_executing` | enqueue | before the body |
//! | `while_executing` | before the body | after the body |
//! | `until_executed` | enqueue | after the body |
//! | `until_and_while_executing` | enqueue, then a `:RUN` lock before the body | enqueue lock before the body, `:RUN` lock after |
//! | `until_timeout` | enqueue | never (TTL) |
//! | `none` | - | - |
//!
//! A duplicate is an ordinary [`LockOutcome::Duplicate`], never an error.
//! Releases only ever delete locks the item's token owns.

mod guard;
mod lock;
mod strategy;
mod types;


pub use guard::ExecutionGuard;
pub use lock::{Lock, LockContext};
pub use strategy::{Strategy, UniqueLock};
pub use types::{LockOutcome, Phase};
