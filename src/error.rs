//! Error types for the policy store adapter.
//!
//! Errors are grouped by how the caller is expected to react: connection and
//! cursor failures abort the current operation, decode failures on a single
//! stored record are tolerated during loads, and state-precondition failures
//! (saving a filtered policy) are always reported.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the adapter.
#[derive(Error, Debug)]
pub enum Error {
    /// Connecting to, disconnecting from, or talking to the document store failed
    #[error("Connection error: {message}")]
    Connection {
        /// Detailed error message
        message: String,
    },

    /// A stored document could not be turned into a policy rule
    #[error("Decode error: {message}")]
    Decode {
        /// Detailed error message
        message: String,
        /// Identifier of the offending document, if it had one
        document_id: Option<String>,
    },

    /// Full save refused because the loaded policy is only a subset
    #[error("cannot save a filtered policy")]
    FilteredSave,

    /// Iterating the result of a find failed part way through
    #[error("Cursor error: {message}")]
    Cursor {
        /// Detailed error message
        message: String,
    },

    /// A rule or request is not representable
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
        /// Field that caused the error, if applicable
        field: Option<String>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Detailed error message
        message: String,
        /// Configuration key that caused the error
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Error::Connection {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
            document_id: None,
        }
    }

    /// Create a decode error naming the offending document.
    pub fn decode_document(message: impl Into<String>, document_id: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
            document_id: Some(document_id.into()),
        }
    }

    /// Create a cursor error.
    pub fn cursor(message: impl Into<String>) -> Self {
        Error::Cursor {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field context.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error with key context.
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Check if the caller may reasonably retry the operation.
    ///
    /// The adapter itself never retries.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Connection { .. } | Error::Cursor { .. })
    }

    /// Get the error category for metrics and logs.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Connection { .. } => "connection",
            Error::Decode { .. } => "decode",
            Error::FilteredSave => "filtered_save",
            Error::Cursor { .. } => "cursor",
            Error::Validation { .. } => "validation",
            Error::Config { .. } => "config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::decode("missing ptype");
        assert!(matches!(err, Error::Decode { .. }));
        assert_eq!(err.category(), "decode");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::connection("refused").is_recoverable());
        assert!(Error::cursor("reset by peer").is_recoverable());
        assert!(!Error::FilteredSave.is_recoverable());
        assert!(!Error::validation("too many fields").is_recoverable());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::FilteredSave.to_string(), "cannot save a filtered policy");

        let err = Error::validation_field("rule has 7 values", "rule");
        assert!(err.to_string().contains("rule has 7 values"));
    }

    #[test]
    fn test_decode_document_keeps_id() {
        match Error::decode_document("not an object", "abc") {
            Error::Decode { document_id, .. } => assert_eq!(document_id.as_deref(), Some("abc")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
