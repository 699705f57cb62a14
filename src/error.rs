//! Error types for parley.
//!
//! `ParleyError` is what commands return; the narrower errors raised at the
//! collaborator boundaries (agent backend, trigger, prompt templates) live next
//! to the code that raises them and convert into it where a command needs to
//! stop.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for parley operations.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// User provided invalid arguments or input.
    #[error("{0}")]
    UserError(String),

    /// A configuration file is malformed or holds invalid values.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The agent backend could not produce a response.
    #[error("Agent backend failed: {0}")]
    BackendError(String),

    /// The issue tracker rejected a read or write.
    #[error("Issue tracker operation failed: {0}")]
    TrackerError(String),
}

impl ParleyError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ParleyError::UserError(_) => exit_codes::USER_ERROR,
            ParleyError::ConfigError(_) => exit_codes::CONFIG_ERROR,
            ParleyError::BackendError(_) => exit_codes::BACKEND_FAILURE,
            ParleyError::TrackerError(_) => exit_codes::TRACKER_FAILURE,
        }
    }
}

/// Result type alias for parley operations.
pub type Result<T> = std::result::Result<T, ParleyError>;
