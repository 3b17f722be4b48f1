//! Queue plumbing: the send-side trait, delivery envelopes, and adapters.
//!
//! - **jsonl**: append-only spool file, one message body per line
//! - **channel**: bounded in-process channel for local runs

mod channel;
mod jsonl;

pub use channel::{bounded_channel, BatchReceiver, ChannelQueue};
pub use jsonl::{parse_spool, read_spool, JsonlQueue};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::types::IngestMessage;

/// Anything the ingestion dispatcher can enqueue messages on.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Submit one message. Failures are returned, never swallowed.
    async fn send(&self, message: &IngestMessage) -> Result<(), QueueError>;
}

/// One message as delivered to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredMessage {
    /// Queue-assigned identifier, echoed back for failed items
    pub message_id: String,

    /// Raw body; parsed by the processor so malformed bodies can be classified
    pub body: String,

    /// Deliveries so far, including this one (tracked by local runs only)
    #[serde(skip, default = "first_delivery")]
    pub receive_count: u32,
}

fn first_delivery() -> u32 {
    1
}

impl DeliveredMessage {
    pub fn new(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
            receive_count: 1,
        }
    }
}

/// A delivery batch: `{"Records": [{"messageId": ..., "body": ...}]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<DeliveredMessage>,
}

/// Partial batch response naming the messages to redeliver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub item_identifier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_event_parses_records() {
        let json = r#"{
            "Records": [
                {"messageId": "m-1", "body": "{\"bucket\":\"b\",\"key\":\"incoming/a.png\"}",
                 "receiptHandle": "ignored", "attributes": {"ApproximateReceiveCount": "1"}},
                {"messageId": "m-2", "body": "garbage"}
            ]
        }"#;
        let event: QueueEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.records.len(), 2);
        assert_eq!(event.records[0].message_id, "m-1");
        assert_eq!(event.records[1].body, "garbage");
        assert!(event.records.iter().all(|m| m.receive_count == 1));
    }

    #[test]
    fn test_batch_response_wire_format() {
        let response = BatchResponse {
            batch_item_failures: vec![BatchItemFailure {
                item_identifier: "m-2".to_string(),
            }],
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"batchItemFailures":[{"itemIdentifier":"m-2"}]}"#
        );
    }
}
