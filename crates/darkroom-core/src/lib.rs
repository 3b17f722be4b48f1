//! darkroom core - idempotent image metadata pipeline.
//!
//! Two stages connected by an at-least-once queue:
//!
//! ```text
//! storage notification → IngestionDispatcher → queue
//!     → BatchProcessor → (IdempotencyGate, ObjectGateway, MetadataExtractor)
//!     → metadata/<name>.json
//! ```
//!
//! The processing stage writes at most one artifact per source key no matter
//! how often a message is delivered: the artifact key is a pure function of
//! the source key, and its existence is the completion marker.
//!
//! # Usage
//!
//! ```rust,ignore
//! use darkroom_core::{Config, Darkroom, DeliveredMessage};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let darkroom = Darkroom::new(Config::load()?)?;
//!     let processor = darkroom.processor();
//!
//!     let report = processor
//!         .process_batch(&[DeliveredMessage::new("m-1", r#"{"bucket":"uploads","key":"incoming/a.png"}"#)])
//!         .await;
//!     println!("{}", serde_json::to_string(&report.response())?);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod store;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    ConfigError, DarkroomError, DecodeError, ErrorKind, QueueError, Result, StoreError,
    StoreResult,
};
pub use pipeline::{
    BatchProcessor, BatchReport, DispatchSummary, EligibilityFilter, IngestionDispatcher,
    MetadataExtractor, StorageEvent,
};
pub use queue::{BatchResponse, DeliveredMessage, MessageQueue, QueueEvent};
pub use store::{FetchedObject, ObjectGateway, ObjectStoreGateway};
pub use types::{BatchStats, ImageFormat, IngestMessage, Metadata, ProcessingOutcome, SourceObject};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Process-wide handle: configuration plus the one shared storage gateway.
///
/// Build it once at startup and hand out processors and dispatchers from it.
/// Construction does no I/O; bucket stores are opened on first use.
pub struct Darkroom {
    config: Config,
    gateway: Arc<dyn ObjectGateway>,
}

impl Darkroom {
    /// Create a handle with a gateway for the configured storage backend.
    pub fn new(config: Config) -> Result<Self> {
        let root = config.storage_root()?;
        let gateway = Arc::new(ObjectStoreGateway::new(&config.storage, root));
        tracing::debug!(
            "Initializing darkroom v{} ({:?} storage)",
            VERSION,
            config.storage.backend
        );
        Ok(Self { config, gateway })
    }

    /// Create a handle over an existing gateway.
    pub fn with_gateway(config: Config, gateway: Arc<dyn ObjectGateway>) -> Self {
        Self { config, gateway }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared storage gateway.
    pub fn gateway(&self) -> Arc<dyn ObjectGateway> {
        Arc::clone(&self.gateway)
    }

    /// A batch processor over the shared gateway.
    pub fn processor(&self) -> BatchProcessor {
        BatchProcessor::new(self.gateway(), &self.config)
    }

    /// A dispatcher sending to `queue` with the configured eligibility rules.
    pub fn dispatcher(&self, queue: Arc<dyn MessageQueue>) -> IngestionDispatcher {
        IngestionDispatcher::new(queue, EligibilityFilter::new(&self.config.filter))
    }

    /// Dispatch a notification to the JSONL spool at `spool`, or at the
    /// configured `queue.spool` when none is given.
    pub async fn ingest_to_spool(
        &self,
        event: &StorageEvent,
        spool: Option<PathBuf>,
    ) -> Result<DispatchSummary> {
        let spool = match spool {
            Some(path) => path,
            None => self.config.spool_path()?,
        };
        let queue = Arc::new(queue::JsonlQueue::new(spool));
        Ok(self.dispatcher(queue).dispatch(event).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_darkroom_new_does_no_io() {
        let mut config = Config::default();
        config.storage.root = std::path::PathBuf::from("/nonexistent/darkroom/buckets");
        let darkroom = Darkroom::new(config).unwrap();
        assert!(!std::path::Path::new("/nonexistent/darkroom/buckets").exists());
        assert_eq!(darkroom.config().queue.batch_size, 10);
    }

    #[tokio::test]
    async fn test_ingest_to_spool_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let spool = dir.path().join("queue.jsonl");
        let darkroom =
            Darkroom::with_gateway(Config::default(), Arc::new(ObjectStoreGateway::in_memory()));
        let event: StorageEvent = serde_json::from_str(
            r#"{"Records":[{"s3":{"bucket":{"name":"uploads"},"object":{"key":"incoming/a.png"}}}]}"#,
        )
        .unwrap();

        let summary = darkroom
            .ingest_to_spool(&event, Some(spool.clone()))
            .await
            .unwrap();
        assert_eq!(summary.enqueued, 1);
        assert_eq!(queue::read_spool(&spool).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_to_unwritable_spool_is_queue_error() {
        let dir = tempfile::tempdir().unwrap();
        let darkroom =
            Darkroom::with_gateway(Config::default(), Arc::new(ObjectStoreGateway::in_memory()));
        let event: StorageEvent = serde_json::from_str(
            r#"{"Records":[{"s3":{"bucket":{"name":"uploads"},"object":{"key":"incoming/a.png"}}}]}"#,
        )
        .unwrap();

        // A directory cannot be opened for appending
        let err = darkroom
            .ingest_to_spool(&event, Some(dir.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(matches!(err, DarkroomError::Queue(QueueError::Spool { .. })));
    }

    #[tokio::test]
    async fn test_processors_share_gateway() {
        let gateway: Arc<dyn ObjectGateway> = Arc::new(ObjectStoreGateway::in_memory());
        let darkroom = Darkroom::with_gateway(Config::default(), gateway);
        darkroom
            .gateway()
            .put(
                "uploads",
                "metadata/a.png.json",
                bytes::Bytes::from_static(b"{}"),
                "application/json",
            )
            .await
            .unwrap();

        let outcome = darkroom
            .processor()
            .process_message(r#"{"bucket":"uploads","key":"incoming/a.png"}"#)
            .await;
        assert_eq!(outcome, ProcessingOutcome::SkippedAlreadyDone);
    }
}
