//! Error types for the relay workspace.
//!
//! Turn-level failures of the assistant process are not errors in this sense:
//! they travel inside [`crate::session::TurnResult`] so the chat layer always
//! has something to render. `RelayError` covers everything else (configuration,
//! filesystem access, rejected users).

use thiserror::Error;

/// A shared error type for the relay crates.
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat user outside the configured allow-list
    #[error("User {user_id} is not allowed to use this bridge")]
    Unauthorized { user_id: i64 },
}

impl RelayError {
    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

/// A type alias for `Result<T, RelayError>`.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion_keeps_kind() {
        let err: RelayError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert!(err.to_string().contains("PermissionDenied"));
    }

    #[test]
    fn test_config_helper() {
        let err = RelayError::config("bad timeout");
        assert_eq!(err.to_string(), "Configuration error: bad timeout");
    }

    #[test]
    fn test_unauthorized_names_the_user() {
        let err = RelayError::Unauthorized { user_id: 7 };
        assert_eq!(err.to_string(), "User 7 is not allowed to use this bridge");
    }
}
