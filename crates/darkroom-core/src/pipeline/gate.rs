//! Idempotency gate: has this source object already been processed?
//!
//! The answer is "does its artifact exist". No external state is kept; the
//! deterministic artifact key is what makes the probe sufficient.

use std::sync::Arc;

use crate::error::StoreResult;
use crate::store::ObjectGateway;

use super::artifact::{ArtifactKey, ArtifactLayout};

/// Probes for a source object's derived artifact.
#[derive(Clone)]
pub struct IdempotencyGate {
    gateway: Arc<dyn ObjectGateway>,
    layout: ArtifactLayout,
}

impl IdempotencyGate {
    pub fn new(gateway: Arc<dyn ObjectGateway>, layout: ArtifactLayout) -> Self {
        Self { gateway, layout }
    }

    /// Artifact key for a source key.
    pub fn artifact_key(&self, source_key: &str) -> ArtifactKey {
        self.layout.key_for(source_key)
    }

    /// Whether the artifact for `source_key` already exists in `bucket`.
    ///
    /// `Ok(true)` exists, `Ok(false)` definitively absent. A failed probe is
    /// returned as an error and must not be read as either answer.
    pub async fn already_processed(&self, bucket: &str, source_key: &str) -> StoreResult<bool> {
        let key = self.artifact_key(source_key);
        self.gateway.exists(bucket, key.as_str()).await
    }
}
