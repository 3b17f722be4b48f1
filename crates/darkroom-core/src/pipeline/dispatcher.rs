//! Ingestion dispatcher: storage notifications in, queue messages out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::QueueError;
use crate::queue::MessageQueue;
use crate::types::IngestMessage;

use super::filter::EligibilityFilter;
use super::notification::StorageEvent;

/// Counts for one dispatched notification batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub enqueued: usize,
    pub skipped: usize,
}

/// Filters notification records and enqueues one message per eligible object.
pub struct IngestionDispatcher {
    queue: Arc<dyn MessageQueue>,
    filter: EligibilityFilter,
}

impl IngestionDispatcher {
    pub fn new(queue: Arc<dyn MessageQueue>, filter: EligibilityFilter) -> Self {
        Self { queue, filter }
    }

    /// Dispatch every record in a notification batch.
    ///
    /// A failed send aborts the batch and is returned to the caller, so the
    /// notification source redelivers the whole batch. Records already sent
    /// are sent again on that retry; the processing stage absorbs the
    /// duplicates.
    pub async fn dispatch(&self, event: &StorageEvent) -> Result<DispatchSummary, QueueError> {
        let mut summary = DispatchSummary::default();

        for record in &event.records {
            let source = match record.source_object() {
                Ok(source) => source,
                Err(e) => {
                    warn!(
                        bucket = %record.s3.bucket.name,
                        raw_key = %record.s3.object.key,
                        "Skipping record with undecodable key: {e}"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            if !self.filter.in_scope(&source.key) {
                debug!(bucket = %source.bucket, key = %source.key, "Skipping ineligible object");
                summary.skipped += 1;
                continue;
            }

            let message = IngestMessage::from(source);
            self.queue.send(&message).await?;
            debug!(bucket = %message.bucket, key = %message.key, "Enqueued object");
            summary.enqueued += 1;
        }

        info!(
            enqueued = summary.enqueued,
            skipped = summary.skipped,
            "Dispatched notification batch"
        );
        Ok(summary)
    }
}
