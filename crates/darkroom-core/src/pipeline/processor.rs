//! Batch processor: runs each delivered message through gate, fetch, extract
//! and write, and classifies the outcome per message.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{ErrorKind, StoreError};
use crate::queue::{BatchItemFailure, BatchResponse, DeliveredMessage};
use crate::store::ObjectGateway;
use crate::types::{BatchStats, IngestMessage, Metadata, ProcessingOutcome};

use super::artifact::{ArtifactLayout, ARTIFACT_CONTENT_TYPE};
use super::extract::MetadataExtractor;
use super::filter::EligibilityFilter;
use super::gate::IdempotencyGate;

/// Outcome of one message in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageResult {
    pub message_id: String,
    pub outcome: ProcessingOutcome,
}

/// Per-message outcomes for one batch, in delivery order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<MessageResult>,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Whether any message must be redelivered.
    pub fn has_failures(&self) -> bool {
        self.stats.failed > 0
    }

    /// Ids of the messages to redeliver.
    pub fn retryable_ids(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.outcome.is_retryable())
            .map(|r| r.message_id.as_str())
    }

    /// Partial batch response naming exactly the retryable messages.
    pub fn response(&self) -> BatchResponse {
        BatchResponse {
            batch_item_failures: self
                .retryable_ids()
                .map(|id| BatchItemFailure {
                    item_identifier: id.to_string(),
                })
                .collect(),
        }
    }
}

/// Processes delivery batches against a shared gateway.
///
/// Holds no per-batch state, so one instance can serve any number of
/// concurrent workers.
#[derive(Clone)]
pub struct BatchProcessor {
    gateway: Arc<dyn ObjectGateway>,
    gate: IdempotencyGate,
    filter: EligibilityFilter,
}

impl BatchProcessor {
    /// Create a processor from config.
    pub fn new(gateway: Arc<dyn ObjectGateway>, config: &Config) -> Self {
        Self::with_parts(
            gateway,
            EligibilityFilter::new(&config.filter),
            ArtifactLayout::new(&config.artifacts),
        )
    }

    /// Create a processor from explicit parts.
    pub fn with_parts(
        gateway: Arc<dyn ObjectGateway>,
        filter: EligibilityFilter,
        layout: ArtifactLayout,
    ) -> Self {
        let gate = IdempotencyGate::new(Arc::clone(&gateway), layout);
        Self {
            gateway,
            gate,
            filter,
        }
    }

    /// Process every message in a batch.
    ///
    /// Messages run sequentially and independently; no outcome stops the
    /// rest of the batch. Only `Failed` outcomes need redelivery.
    pub async fn process_batch(&self, messages: &[DeliveredMessage]) -> BatchReport {
        let start = Instant::now();
        let mut report = BatchReport::default();

        for message in messages {
            let outcome = self.process_message(&message.body).await;
            debug!(
                message_id = %message.message_id,
                outcome = outcome.label(),
                "Message handled"
            );
            report.stats.record(&outcome);
            report.results.push(MessageResult {
                message_id: message.message_id.clone(),
                outcome,
            });
        }

        let stats = &report.stats;
        info!(
            messages = messages.len(),
            completed = stats.completed,
            already_done = stats.already_done,
            ineligible = stats.ineligible,
            undecodable = stats.undecodable,
            malformed = stats.malformed,
            rejected = stats.rejected,
            failed = stats.failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch processed"
        );
        report
    }

    /// Process a single message body.
    pub async fn process_message(&self, body: &str) -> ProcessingOutcome {
        match IngestMessage::parse(body) {
            Ok(message) if message.bucket.is_empty() || message.key.is_empty() => {
                error!(len = body.len(), "Message names no object, dropping");
                ProcessingOutcome::SkippedMalformed
            }
            Ok(message) => self.process_object(&message).await,
            Err(e) => {
                error!(len = body.len(), "Malformed message, dropping: {e}");
                ProcessingOutcome::SkippedMalformed
            }
        }
    }

    /// Permanent storage errors are absorbed; everything else is redelivered.
    fn store_failure(step: &str, bucket: &str, key: &str, err: StoreError) -> ProcessingOutcome {
        match err.kind() {
            ErrorKind::Permanent => {
                error!(bucket = %bucket, key = %key, "{step} rejected, dropping: {err}");
                ProcessingOutcome::SkippedRejected {
                    reason: err.to_string(),
                }
            }
            kind => {
                warn!(bucket = %bucket, key = %key, kind = ?kind, "{step} failed: {err}");
                ProcessingOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Gate, fetch, extract and write for one parsed message.
    pub async fn process_object(&self, message: &IngestMessage) -> ProcessingOutcome {
        let bucket = message.bucket.as_str();
        let key = message.key.as_str();

        if !self.filter.in_scope(key) {
            debug!(bucket = %bucket, key = %key, "Ignoring key outside source scope");
            return ProcessingOutcome::SkippedIneligible;
        }

        match self.gate.already_processed(bucket, key).await {
            Ok(true) => {
                debug!(bucket = %bucket, key = %key, "Metadata already exists, skipping");
                return ProcessingOutcome::SkippedAlreadyDone;
            }
            Ok(false) => {}
            Err(e) => return Self::store_failure("Existence probe", bucket, key, e),
        }

        let object = match self.gateway.fetch(bucket, key).await {
            Ok(object) => object,
            Err(e) => return Self::store_failure("Fetch", bucket, key, e),
        };

        let info = match MetadataExtractor::extract(&object.bytes) {
            Ok(info) => info,
            Err(e) => {
                error!(bucket = %bucket, key = %key, "Failed to read image, dropping: {e}");
                return ProcessingOutcome::SkippedUndecodable;
            }
        };

        let metadata = Metadata {
            source_bucket: message.bucket.clone(),
            source_key: message.key.clone(),
            width: info.width,
            height: info.height,
            file_size_bytes: object.size_bytes,
            format: info.format,
        };
        let body = match serde_json::to_vec(&metadata) {
            Ok(body) => Bytes::from(body),
            Err(e) => {
                return ProcessingOutcome::Failed {
                    reason: format!("cannot encode metadata: {e}"),
                }
            }
        };

        let artifact = self.gate.artifact_key(key);
        if let Err(e) = self
            .gateway
            .put(bucket, artifact.as_str(), body, ARTIFACT_CONTENT_TYPE)
            .await
        {
            return Self::store_failure("Write", bucket, artifact.as_str(), e);
        }

        info!(
            bucket = %bucket,
            key = %key,
            artifact = %artifact,
            width = metadata.width,
            height = metadata.height,
            format = %metadata.format,
            "Wrote metadata"
        );
        ProcessingOutcome::Completed
    }
}
