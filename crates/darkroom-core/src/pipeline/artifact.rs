//! Deterministic mapping from a source key to its metadata artifact key.
//!
//! The same source key always maps to the same artifact key, independent of
//! bucket, etag or time. That determinism is what lets the artifact's
//! existence double as the completion marker.

use std::fmt;

use crate::config::ArtifactConfig;

/// Content type of every metadata artifact.
pub const ARTIFACT_CONTENT_TYPE: &str = "application/json";

/// Key of a derived metadata artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where artifacts are written: `<prefix><basename(source_key)>.json`.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    prefix: String,
}

impl ArtifactLayout {
    pub fn new(config: &ArtifactConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
        }
    }

    /// Artifact key for a source object key.
    ///
    /// Only the final path segment is kept, so `incoming/a/x.png` and
    /// `incoming/b/x.png` share one artifact.
    pub fn key_for(&self, source_key: &str) -> ArtifactKey {
        ArtifactKey(format!("{}{}.json", self.prefix, basename(source_key)))
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new(&ArtifactConfig::default())
    }
}

/// Last path segment, ignoring trailing slashes.
fn basename(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
