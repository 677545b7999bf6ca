//! Exit code constants for the uniquejobs CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unknown lock)
//! - 2: Configuration error (invalid job type declaration or store settings)
//! - 3: Store unavailable (connection, timeout, pool exhaustion)
//! - 4: Lock failure (ownership conflict, malformed digest)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or a lock that does not exist.
pub const USER_ERROR: i32 = 1;

/// Configuration error: the config file failed to load or validate.
pub const CONFIG_ERROR: i32 = 2;

/// The key-value store could not be reached.
pub const STORE_FAILURE: i32 = 3;

/// Lock failure: the lock is owned by someone else or its digest is malformed.
pub const LOCK_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, CONFIG_ERROR, STORE_FAILURE, LOCK_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
