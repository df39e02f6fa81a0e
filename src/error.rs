//! Error types for replay-upload
//!
//! Per-item failures never surface here: they become terminal
//! [`Status`](crate::types::Status) values on the affected item. This type covers
//! configuration problems, session operations and the transport contract.

use thiserror::Error;

/// Result type alias for replay-upload operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for replay-upload
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "validation.min_size_bytes")
        key: Option<String>,
    },

    /// HTTP transport error (no usable response received)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Transport failure reported by a non-HTTP backend
    #[error("transport error: {0}")]
    Transport(String),

    /// A response arrived but did not match the expected contract
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid endpoint URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Credential exchange failed; carries the message to show the user
    #[error("{0}")]
    AuthenticationFailed(String),

    /// The session is not authenticated
    #[error("not authenticated")]
    NotAuthenticated,
}

impl Error {
    /// Whether this error means no response was received at all
    pub fn is_transport(&self) -> bool {
        match self {
            Error::Network(e) => !e.is_decode() && !e.is_status(),
            Error::Transport(_) | Error::Io(_) => true,
            _ => false,
        }
    }

    /// Shorthand for a configuration error tied to a key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(Error::Transport("connection refused".into()).is_transport());
        assert!(
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset"
            ))
            .is_transport()
        );
        assert!(!Error::InvalidResponse("missing filename".into()).is_transport());
        assert!(!Error::NotAuthenticated.is_transport());
        assert!(!Error::AuthenticationFailed("Wrong password".into()).is_transport());
    }

    #[test]
    fn authentication_failure_displays_message_verbatim() {
        let err = Error::AuthenticationFailed("Wrong password".into());
        assert_eq!(err.to_string(), "Wrong password");
    }

    #[test]
    fn config_error_keeps_key() {
        match Error::config("polling.interval", "must be non-zero") {
            Error::Config { message, key } => {
                assert_eq!(message, "must be non-zero");
                assert_eq!(key.as_deref(), Some("polling.interval"));
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }
}
