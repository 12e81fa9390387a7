//! Exit code constants for the socklock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid lock name, refused clear)
//! - 2: Configuration error
//! - 3: Platform failure (socket I/O the lock cannot recover from)
//! - 4: Lock failure (gave up, abandoned, or address held by a live process)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or an operation refused for safety.
pub const USER_ERROR: i32 = 1;

/// Configuration file could not be read, parsed, or validated.
pub const CONFIG_FAILURE: i32 = 2;

/// Platform failure: permission denied, path too long, resource exhaustion.
pub const PLATFORM_FAILURE: i32 = 3;

/// Lock failure: the lock could not be acquired or cleared.
pub const LOCK_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, CONFIG_FAILURE, PLATFORM_FAILURE, LOCK_FAILURE];
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
