//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which storage backend the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local in-memory buckets
    Memory,
    /// One directory per bucket under `storage.root`
    Local,
    /// Amazon S3 (or an S3-compatible endpoint)
    S3,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection
    pub backend: StorageBackend,

    /// Root directory for the `local` backend; each bucket is a subdirectory
    pub root: PathBuf,

    /// AWS region for the `s3` backend (falls back to `AWS_REGION`)
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible stores
    pub endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root: PathBuf::from("~/.darkroom/buckets"),
            region: None,
            endpoint: None,
        }
    }
}

/// Queue settings for the spool file and in-process runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// JSONL spool that `ingest` appends to and `process` reads
    pub spool: PathBuf,

    /// Messages handed to one worker invocation
    pub batch_size: usize,

    /// Deliveries before a failing message is dead-lettered (local runs)
    pub max_receive_count: u32,

    /// Max messages buffered in the in-process channel
    pub buffer_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            spool: PathBuf::from("~/.darkroom/queue.jsonl"),
            batch_size: 10,
            max_receive_count: 3,
            buffer_size: 100,
        }
    }
}

/// Eligibility rules for source objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Prefix a key must start with to be processed
    pub source_prefix: String,

    /// Allowed extensions, without the leading dot, matched case-insensitively
    pub allowed_extensions: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            source_prefix: "incoming/".to_string(),
            allowed_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
        }
    }
}

/// Where derived artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Prefix for metadata records (`<prefix><basename>.json`)
    pub prefix: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            prefix: "metadata/".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
