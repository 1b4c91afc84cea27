//! Common error types for cvsync

use thiserror::Error;

/// Common result type for cvsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across cvsync crates
#[derive(Error, Debug)]
pub enum Error {
    /// Payload field missing or failing type coercion
    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },

    /// Event tag not in the dispatch table
    #[error("Unrecognized event type {0:?}")]
    UnrecognizedEventKind(String),

    /// Event envelope does not have the expected shape
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Persisted record could not be decoded
    #[error("Corrupt record {location}: {reason}")]
    CorruptRecord { location: String, reason: String },

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error outside payload validation
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Outbound notification could not be delivered
    #[error("Notification error: {0}")]
    Notify(String),
}

impl Error {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable name of the error kind, used in client-facing error details
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "ValidationError",
            Error::UnrecognizedEventKind(_) => "UnrecognizedEventKind",
            Error::MalformedEvent(_) => "MalformedEvent",
            Error::CorruptRecord { .. } => "CorruptRecord",
            Error::Io(_) => "IoError",
            Error::Json(_) => "JsonError",
            Error::Config(_) => "ConfigError",
            Error::Notify(_) => "NotifyError",
        }
    }

    /// True when the error was caused by the event sender rather than by this process
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. } | Error::UnrecognizedEventKind(_) | Error::MalformedEvent(_)
        )
    }
}
