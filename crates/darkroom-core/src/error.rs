//! Error types for the darkroom pipeline.
//!
//! Errors are organized by concern. Storage errors carry an explicit
//! [`ErrorKind`] so callers branch on classification rather than on
//! messages or status codes.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for darkroom operations.
#[derive(Error, Debug)]
pub enum DarkroomError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Queue errors
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Classification of a storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The object does not exist.
    NotFound,
    /// Network, throttling or server-side failure; redelivery may succeed.
    Transient,
    /// Misconfiguration or unsupported request; redelivery will not help.
    Permanent,
}

/// Errors surfaced by the object store gateway.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No object at `bucket/key`
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Retryable failure talking to the store
    #[error("Transient storage failure for {bucket}/{key}: {message}")]
    Transient {
        bucket: String,
        key: String,
        message: String,
    },

    /// Non-retryable failure (bad configuration, unsupported operation)
    #[error("Storage failure for {bucket}/{key}: {message}")]
    Permanent {
        bucket: String,
        key: String,
        message: String,
    },
}

impl StoreError {
    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Transient { .. } => ErrorKind::Transient,
            StoreError::Permanent { .. } => ErrorKind::Permanent,
        }
    }

    /// Build a transient error for `bucket/key`.
    pub fn transient(bucket: &str, key: &str, message: impl Into<String>) -> Self {
        StoreError::Transient {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Map an `object_store` error onto the darkroom taxonomy.
    pub(crate) fn from_object_store(bucket: &str, key: &str, err: object_store::Error) -> Self {
        use object_store::Error as E;
        match err {
            E::NotFound { .. } => StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            E::InvalidPath { .. }
            | E::NotSupported { .. }
            | E::NotImplemented
            | E::PermissionDenied { .. }
            | E::Unauthenticated { .. }
            | E::UnknownConfigurationKey { .. } => StoreError::Permanent {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: err.to_string(),
            },
            other => StoreError::transient(bucket, key, other.to_string()),
        }
    }
}

/// Errors raised while handing messages to a queue.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The spool file could not be written
    #[error("Failed to write queue spool {path}: {source}")]
    Spool {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The in-process receiver has been dropped
    #[error("Queue receiver closed")]
    Closed,

    /// The message body could not be serialized
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reasons the metadata extractor rejects a byte buffer.
///
/// Every variant is terminal: retrying the same bytes gives the same answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Empty or too short to carry an image header
    #[error("Image data too short ({0} bytes)")]
    Truncated(usize),

    /// Magic bytes do not match any known image format
    #[error("Unrecognized image format")]
    Unrecognized,

    /// Format is recognized but not one the pipeline reports
    #[error("Unsupported image format: {0}")]
    Unsupported(String),

    /// Header is present but could not be parsed
    #[error("Corrupt image header: {0}")]
    Corrupt(String),
}

/// Convenience type alias for darkroom results.
pub type Result<T> = std::result::Result<T, DarkroomError>;

/// Convenience type alias for storage results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
