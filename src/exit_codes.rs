//! Exit code constants for the parley CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unknown agent, unreadable input)
//! - 2: Configuration error (invalid config.yaml / agents.yaml)
//! - 3: Agent backend failure (every requested agent failed)
//! - 4: Issue tracker failure (issue could not be read or written)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid input.
pub const USER_ERROR: i32 = 1;

/// Configuration file could not be parsed or failed validation.
pub const CONFIG_ERROR: i32 = 2;

/// The agent backend produced no usable response.
pub const BACKEND_FAILURE: i32 = 3;

/// The issue tracker rejected a read or write.
pub const TRACKER_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            CONFIG_ERROR,
            BACKEND_FAILURE,
            TRACKER_FAILURE,
        ];
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
