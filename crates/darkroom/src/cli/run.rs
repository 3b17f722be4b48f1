//! The `darkroom run` command: both stages in-process over a bounded channel.
//!
//! Workers pull batches concurrently. Messages reported back for redelivery
//! are retried until their receive count reaches `queue.max_receive_count`,
//! then dead-lettered.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use darkroom_core::queue::bounded_channel;
use darkroom_core::{BatchStats, Config, Darkroom, DeliveredMessage, StorageEvent};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Notification event JSON files
    #[arg(required = true)]
    pub events: Vec<PathBuf>,

    /// Concurrent processing workers
    #[arg(short, long, default_value = "4")]
    pub workers: usize,
}

/// Cumulative result of a local run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    /// Messages sent by the dispatcher
    pub dispatched: usize,

    /// Records the dispatcher filtered out
    pub skipped: usize,

    /// Outcome counts over every delivery, redeliveries included
    pub stats: BatchStats,

    /// Deliveries after the first
    pub redeliveries: usize,

    /// Ids of messages that hit the receive limit
    pub dead_letters: Vec<String>,
}

/// Execute the run command.
pub async fn execute(args: RunArgs, config: Config) -> anyhow::Result<()> {
    let mut events = Vec::with_capacity(args.events.len());
    for path in &args.events {
        let event: StorageEvent = serde_json::from_str(&super::read_input(path)?)
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        events.push(event);
    }

    let darkroom = Darkroom::new(config)?;
    let summary = run_local(&darkroom, &events, args.workers).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if !summary.dead_letters.is_empty() {
        anyhow::bail!("{} message(s) dead-lettered", summary.dead_letters.len());
    }
    Ok(())
}

/// Dispatch every event onto a bounded channel and drain it with `workers`
/// concurrent processors.
pub async fn run_local(
    darkroom: &Darkroom,
    events: &[StorageEvent],
    workers: usize,
) -> anyhow::Result<RunSummary> {
    let queue_config = darkroom.config().queue.clone();
    let (queue, receiver) = bounded_channel(&queue_config);
    let receiver = Arc::new(Mutex::new(receiver));
    let processor = darkroom.processor();

    let handles: Vec<_> = (0..workers.max(1))
        .map(|worker| {
            let receiver = Arc::clone(&receiver);
            let processor = processor.clone();
            tokio::spawn(async move {
                let mut stats = BatchStats::default();
                let mut retry = Vec::new();
                loop {
                    let batch = receiver.lock().await.next_batch().await;
                    let Some(batch) = batch else { break };
                    let report = processor.process_batch(&batch).await;
                    stats.merge(&report.stats);
                    let failed: HashSet<&str> = report.retryable_ids().collect();
                    retry.extend(
                        batch
                            .iter()
                            .filter(|m| failed.contains(m.message_id.as_str()))
                            .cloned(),
                    );
                }
                tracing::debug!(worker, "Worker drained");
                (stats, retry)
            })
        })
        .collect();

    let mut summary = RunSummary::default();
    {
        // Dropping the dispatcher closes the channel so workers can finish.
        let dispatcher = darkroom.dispatcher(Arc::new(queue));
        for event in events {
            let dispatched = dispatcher.dispatch(event).await?;
            summary.dispatched += dispatched.enqueued;
            summary.skipped += dispatched.skipped;
        }
    }

    let mut pending = Vec::new();
    for result in join_all(handles).await {
        let (stats, retry) = result?;
        summary.stats.merge(&stats);
        pending.extend(retry);
    }

    while !pending.is_empty() {
        let (mut redeliver, dead): (Vec<DeliveredMessage>, Vec<DeliveredMessage>) = pending
            .into_iter()
            .partition(|m| m.receive_count < queue_config.max_receive_count);

        for message in dead {
            warn!(
                message_id = %message.message_id,
                receive_count = message.receive_count,
                "Receive limit reached, dead-lettering"
            );
            summary.dead_letters.push(message.message_id);
        }

        for message in &mut redeliver {
            message.receive_count += 1;
        }
        summary.redeliveries += redeliver.len();

        pending = Vec::new();
        for chunk in redeliver.chunks(queue_config.batch_size) {
            let report = processor.process_batch(chunk).await;
            summary.stats.merge(&report.stats);
            let failed: HashSet<&str> = report.retryable_ids().collect();
            pending.extend(
                chunk
                    .iter()
                    .filter(|m| failed.contains(m.message_id.as_str()))
                    .cloned(),
            );
        }
    }

    info!(
        dispatched = summary.dispatched,
        completed = summary.stats.completed,
        redeliveries = summary.redeliveries,
        dead_letters = summary.dead_letters.len(),
        "Run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use darkroom_core::{FetchedObject, ObjectGateway, ObjectStoreGateway, StoreError, StoreResult};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png(width: u32, height: u32) -> Bytes {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(buf)
    }

    fn event(keys: &[&str]) -> StorageEvent {
        let records: Vec<_> = keys
            .iter()
            .map(|key| {
                serde_json::json!({"s3": {"bucket": {"name": "uploads"}, "object": {"key": key}}})
            })
            .collect();
        serde_json::from_value(serde_json::json!({ "Records": records })).unwrap()
    }

    /// Fails the first `failures` fetches, then delegates.
    struct FlakyGateway {
        inner: ObjectStoreGateway,
        failures: usize,
        fetches: AtomicUsize,
    }

    impl FlakyGateway {
        fn new(failures: usize) -> Self {
            Self {
                inner: ObjectStoreGateway::in_memory(),
                failures,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ObjectGateway for FlakyGateway {
        async fn fetch(&self, bucket: &str, key: &str) -> StoreResult<FetchedObject> {
            if self.fetches.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(StoreError::Transient {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message: "connection reset".to_string(),
                });
            }
            self.inner.fetch(bucket, key).await
        }

        async fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
            self.inner.exists(bucket, key).await
        }

        async fn put(
            &self,
            bucket: &str,
            key: &str,
            content: Bytes,
            content_type: &str,
        ) -> StoreResult<()> {
            self.inner.put(bucket, key, content, content_type).await
        }
    }

    async fn seeded(gateway: Arc<dyn ObjectGateway>, keys: &[&str]) -> Darkroom {
        for key in keys {
            gateway
                .put("uploads", key, png(8, 6), "image/png")
                .await
                .unwrap();
        }
        Darkroom::with_gateway(Config::default(), gateway)
    }

    #[tokio::test]
    async fn test_run_processes_every_eligible_upload() {
        let gateway: Arc<dyn ObjectGateway> = Arc::new(ObjectStoreGateway::in_memory());
        let darkroom = seeded(
            Arc::clone(&gateway),
            &["incoming/a.png", "incoming/b.png", "incoming/c.png"],
        )
        .await;
        let events = [
            event(&["incoming/a.png", "incoming/notes.txt"]),
            event(&["incoming/b.png", "incoming/c.png", "elsewhere/d.png"]),
        ];

        let summary = run_local(&darkroom, &events, 3).await.unwrap();

        assert_eq!(summary.dispatched, 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.stats.completed, 3);
        assert_eq!(summary.redeliveries, 0);
        for name in ["a", "b", "c"] {
            let artifact = format!("metadata/{name}.png.json");
            assert!(gateway.exists("uploads", &artifact).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_run_redelivers_until_success() {
        let gateway: Arc<dyn ObjectGateway> = Arc::new(FlakyGateway::new(2));
        let darkroom = seeded(Arc::clone(&gateway), &["incoming/a.png"]).await;

        let summary = run_local(&darkroom, &[event(&["incoming/a.png"])], 1)
            .await
            .unwrap();

        assert_eq!(summary.stats.failed, 2);
        assert_eq!(summary.stats.completed, 1);
        assert_eq!(summary.redeliveries, 2);
        assert!(summary.dead_letters.is_empty());
    }

    #[tokio::test]
    async fn test_run_dead_letters_at_receive_limit() {
        let gateway: Arc<dyn ObjectGateway> = Arc::new(FlakyGateway::new(usize::MAX));
        let darkroom = seeded(Arc::clone(&gateway), &["incoming/a.png"]).await;

        let summary = run_local(&darkroom, &[event(&["incoming/a.png"])], 2)
            .await
            .unwrap();

        assert_eq!(summary.stats.failed, 3);
        assert_eq!(summary.redeliveries, 2);
        assert_eq!(summary.dead_letters, vec!["msg-1".to_string()]);
        assert!(!gateway
            .exists("uploads", "metadata/a.png.json")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_run_twice_is_idempotent() {
        let gateway: Arc<dyn ObjectGateway> = Arc::new(ObjectStoreGateway::in_memory());
        let darkroom = seeded(Arc::clone(&gateway), &["incoming/a.png"]).await;
        let events = [event(&["incoming/a.png"])];

        run_local(&darkroom, &events, 1).await.unwrap();
        let second = run_local(&darkroom, &events, 1).await.unwrap();

        assert_eq!(second.stats.completed, 0);
        assert_eq!(second.stats.already_done, 1);
    }
}
