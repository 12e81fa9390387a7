//! Error types for socklock.
//!
//! Only failures a caller can act on live here. Expected races during an
//! election (address in use, stale address, concurrent reclaim) are absorbed
//! by the election engine and never become a `SocklockError`.

use crate::exit_codes;
use std::io;
use thiserror::Error;

/// Main error type for socklock operations.
#[derive(Error, Debug)]
pub enum SocklockError {
    /// Invalid arguments or an operation refused for safety.
    #[error("{0}")]
    UserError(String),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Unrecoverable I/O failure on a channel address.
    #[error("Platform failure on '{address}': {source}")]
    Platform {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The lock could not be acquired or cleared.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    /// The request was released by its caller before it resolved.
    #[error("Lock request for '{0}' was abandoned before it resolved")]
    Abandoned(String),
}

impl SocklockError {
    /// Wrap an I/O error that occurred on `address`.
    pub fn platform(address: impl std::fmt::Display, source: io::Error) -> Self {
        SocklockError::Platform {
            address: address.to_string(),
            source,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SocklockError::UserError(_) => exit_codes::USER_ERROR,
            SocklockError::ConfigError(_) => exit_codes::CONFIG_FAILURE,
            SocklockError::Platform { .. } => exit_codes::PLATFORM_FAILURE,
            SocklockError::LockError(_) => exit_codes::LOCK_FAILURE,
            SocklockError::Abandoned(_) => exit_codes::LOCK_FAILURE,
        }
    }
}

/// Result type alias for socklock operations.
pub type Result<T> = std::result::Result<T, SocklockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = SocklockError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn config_error_has_correct_exit_code() {
        let err = SocklockError::ConfigError("bad yaml".to_string());
        assert_eq!(err.exit_code(), exit_codes::CONFIG_FAILURE);
    }

    #[test]
    fn platform_error_has_correct_exit_code() {
        let err = SocklockError::platform(
            "/tmp/x.sock",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.exit_code(), exit_codes::PLATFORM_FAILURE);
    }

    #[test]
    fn lock_and_abandon_errors_share_exit_code() {
        let err = SocklockError::LockError("gave up".to_string());
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
        let err = SocklockError::Abandoned("jobs".to_string());
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = SocklockError::platform(
            "/run/a.sock",
            io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert_eq!(
            err.to_string(),
            "Platform failure on '/run/a.sock': permission denied"
        );

        let err = SocklockError::Abandoned("/run/a.sock".to_string());
        assert_eq!(
            err.to_string(),
            "Lock request for '/run/a.sock' was abandoned before it resolved"
        );
    }
}
