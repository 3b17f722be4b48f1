//! Pipeline components for both stages.
//!
//! Ingestion stage:
//! - **notification**: storage event shapes and key decoding
//! - **filter**: eligibility rules (source prefix, image extensions)
//! - **dispatcher**: filters notifications and enqueues messages
//!
//! Processing stage:
//! - **artifact**: deterministic source key → artifact key mapping
//! - **gate**: idempotency probe over the artifact key
//! - **extract**: header-only dimension/format extraction
//! - **processor**: per-message state machine and batch reporting

pub mod artifact;
pub mod dispatcher;
pub mod extract;
pub mod filter;
pub mod gate;
pub mod notification;
pub mod processor;

// Re-exports for convenient access
pub use artifact::{ArtifactKey, ArtifactLayout, ARTIFACT_CONTENT_TYPE};
pub use dispatcher::{DispatchSummary, IngestionDispatcher};
pub use extract::{ImageInfo, MetadataExtractor};
pub use filter::EligibilityFilter;
pub use gate::IdempotencyGate;
pub use notification::{decode_key, StorageEvent};
pub use processor::{BatchProcessor, BatchReport, MessageResult};
