//! The `darkroom ingest` command: notification event → queue spool.

use clap::Args;
use darkroom_core::{Config, Darkroom, StorageEvent};
use std::path::PathBuf;

/// Arguments for the `ingest` command.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Notification event JSON file (`-` for stdin)
    #[arg(required = true)]
    pub event: PathBuf,

    /// Spool file to append messages to (defaults to `queue.spool`)
    #[arg(long)]
    pub spool: Option<PathBuf>,
}

/// Execute the ingest command.
///
/// A send failure returns an error (non-zero exit) so the caller redelivers
/// the whole event.
pub async fn execute(args: IngestArgs, config: Config) -> anyhow::Result<()> {
    let event: StorageEvent = serde_json::from_str(&super::read_input(&args.event)?)?;

    let darkroom = Darkroom::new(config)?;
    let summary = darkroom.ingest_to_spool(&event, args.spool).await?;

    tracing::info!(
        "Enqueued {} of {} record(s)",
        summary.enqueued,
        event.records.len()
    );
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
