//! The `darkroom process` command: delivery batch → partial batch response.

use clap::Args;
use darkroom_core::queue::parse_spool;
use darkroom_core::{BatchResponse, BatchStats, Config, Darkroom, DeliveredMessage, QueueEvent};
use std::path::PathBuf;

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Delivery batch JSON or a JSONL spool file (`-` for stdin)
    #[arg(required = true)]
    pub batch: PathBuf,

    /// Print per-outcome counts to stderr after the response
    #[arg(long)]
    pub stats: bool,
}

/// Execute the process command.
///
/// Prints the partial batch response on stdout. Exits non-zero when any
/// message needs redelivery.
pub async fn execute(args: ProcessArgs, config: Config) -> anyhow::Result<()> {
    let content = super::read_input(&args.batch)?;
    let messages = parse_batch(&content)?;
    let batch_size = config.queue.batch_size;

    let darkroom = Darkroom::new(config)?;
    let processor = darkroom.processor();

    let mut response = BatchResponse::default();
    let mut stats = BatchStats::default();
    for chunk in messages.chunks(batch_size) {
        let report = processor.process_batch(chunk).await;
        stats.merge(&report.stats);
        response
            .batch_item_failures
            .extend(report.response().batch_item_failures);
    }

    println!("{}", serde_json::to_string(&response)?);
    if args.stats {
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }

    if !response.batch_item_failures.is_empty() {
        anyhow::bail!(
            "{} of {} message(s) need redelivery",
            response.batch_item_failures.len(),
            messages.len()
        );
    }
    Ok(())
}

/// Accept either a `{"Records": [...]}` delivery batch or a spool with one
/// message body per line.
fn parse_batch(content: &str) -> anyhow::Result<Vec<DeliveredMessage>> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(content) {
        if value.get("Records").is_some() {
            let event: QueueEvent = serde_json::from_value(value)?;
            return Ok(event.records);
        }
    }
    Ok(parse_spool(content))
}
