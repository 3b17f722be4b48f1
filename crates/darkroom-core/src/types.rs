//! Core data types for the darkroom pipeline.
//!
//! These types describe what flows between the stages: the object a
//! notification points at, the message placed on the queue, the metadata
//! record written back to storage, and the per-message outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A specific object version in a bucket, as reported by a storage notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceObject {
    /// Bucket holding the object
    pub bucket: String,

    /// Object key, already decoded from its transport encoding
    pub key: String,

    /// Content fingerprint supplied by the notification (entity tag)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Queue message body for one eligible source object.
///
/// Wire form: `{"bucket": "...", "key": "...", "etag": "..."}` with `etag`
/// optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestMessage {
    pub bucket: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl IngestMessage {
    /// Parse a message body.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Serialize to the queue body.
    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<SourceObject> for IngestMessage {
    fn from(source: SourceObject) -> Self {
        Self {
            bucket: source.bucket,
            key: source.key,
            etag: source.etag,
        }
    }
}

/// Image container formats the extractor reports.
///
/// Serialized in upper case (`"JPEG"`, `"PNG"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::Gif => "GIF",
            ImageFormat::WebP => "WEBP",
            ImageFormat::Bmp => "BMP",
            ImageFormat::Tiff => "TIFF",
        };
        f.write_str(s)
    }
}

/// The derived artifact written for each processed source object.
///
/// Immutable once written. Its existence is the completion marker, so it
/// must be a pure function of the source: two workers processing the same
/// object produce byte-identical records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub source_bucket: String,
    pub source_key: String,
    pub width: u32,
    pub height: u32,
    pub file_size_bytes: u64,
    pub format: ImageFormat,
}

/// What happened to one delivered message. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Artifact written
    Completed,
    /// Artifact already existed; nothing fetched or written
    SkippedAlreadyDone,
    /// Key outside the source prefix or without an allowed extension
    SkippedIneligible,
    /// Object bytes are not a decodable image; terminal
    SkippedUndecodable,
    /// Message body could not be parsed or names no object; terminal
    SkippedMalformed,
    /// Storage refused the request for a reason redelivery cannot fix
    SkippedRejected { reason: String },
    /// Storage failure; the message must be redelivered
    Failed { reason: String },
}

impl ProcessingOutcome {
    /// Whether the scheduler should redeliver this message.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProcessingOutcome::Failed { .. })
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingOutcome::Completed => "completed",
            ProcessingOutcome::SkippedAlreadyDone => "skipped_already_done",
            ProcessingOutcome::SkippedIneligible => "skipped_ineligible",
            ProcessingOutcome::SkippedUndecodable => "skipped_undecodable",
            ProcessingOutcome::SkippedMalformed => "skipped_malformed",
            ProcessingOutcome::SkippedRejected { .. } => "skipped_rejected",
            ProcessingOutcome::Failed { .. } => "failed",
        }
    }
}

/// Outcome counters for one or more batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BatchStats {
    /// Artifacts written
    pub completed: u64,

    /// Skipped because the artifact already existed
    pub already_done: u64,

    /// Skipped by the eligibility filter
    pub ineligible: u64,

    /// Skipped because the object was not a decodable image
    pub undecodable: u64,

    /// Skipped because the message body was malformed
    pub malformed: u64,

    /// Skipped after a permanent storage error
    #[serde(default)]
    pub rejected: u64,

    /// Reported back for redelivery
    pub failed: u64,
}

impl BatchStats {
    /// Count one outcome.
    pub fn record(&mut self, outcome: &ProcessingOutcome) {
        match outcome {
            ProcessingOutcome::Completed => self.completed += 1,
            ProcessingOutcome::SkippedAlreadyDone => self.already_done += 1,
            ProcessingOutcome::SkippedIneligible => self.ineligible += 1,
            ProcessingOutcome::SkippedUndecodable => self.undecodable += 1,
            ProcessingOutcome::SkippedMalformed => self.malformed += 1,
            ProcessingOutcome::SkippedRejected { .. } => self.rejected += 1,
            ProcessingOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Add another set of counters into this one.
    pub fn merge(&mut self, other: &BatchStats) {
        self.completed += other.completed;
        self.already_done += other.already_done;
        self.ineligible += other.ineligible;
        self.undecodable += other.undecodable;
        self.malformed += other.malformed;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }

    /// Total messages counted.
    pub fn total(&self) -> u64 {
        self.completed
            + self.already_done
            + self.ineligible
            + self.undecodable
            + self.malformed
            + self.rejected
            + self.failed
    }
}
