//! Bounded in-process queue for local end-to-end runs.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::types::IngestMessage;

use super::{DeliveredMessage, MessageQueue};

/// Create a connected queue/receiver pair with the configured buffer and
/// batch sizes.
///
/// When the buffer is full `send` waits, so a fast dispatcher cannot run
/// ahead of the workers by more than `buffer_size` messages.
pub fn bounded_channel(config: &QueueConfig) -> (ChannelQueue, BatchReceiver) {
    let (tx, rx) = mpsc::channel(config.buffer_size);
    (
        ChannelQueue {
            tx,
            next_id: AtomicU64::new(1),
        },
        BatchReceiver {
            rx,
            batch_size: config.batch_size,
        },
    )
}

/// Sending half: assigns message ids and pushes bodies into the channel.
pub struct ChannelQueue {
    tx: mpsc::Sender<DeliveredMessage>,
    next_id: AtomicU64,
}

#[async_trait]
impl MessageQueue for ChannelQueue {
    async fn send(&self, message: &IngestMessage) -> Result<(), QueueError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delivered = DeliveredMessage::new(format!("msg-{id}"), message.to_body()?);
        self.tx
            .send(delivered)
            .await
            .map_err(|_| QueueError::Closed)
    }
}

/// Receiving half: hands out messages in batches of up to `batch_size`.
pub struct BatchReceiver {
    rx: mpsc::Receiver<DeliveredMessage>,
    batch_size: usize,
}

impl BatchReceiver {
    /// Wait for the next batch.
    ///
    /// Blocks until at least one message is available, then takes whatever
    /// else is already buffered up to the batch size. Returns `None` once every
    /// sender is gone and the buffer is empty.
    pub async fn next_batch(&mut self) -> Option<Vec<DeliveredMessage>> {
        let first = self.rx.recv().await?;
        let mut batch = Vec::with_capacity(self.batch_size);
        batch.push(first);
        while batch.len() < self.batch_size {
            match self.rx.try_recv() {
                Ok(message) => batch.push(message),
                Err(_) => break,
            }
        }
        Some(batch)
    }
}
