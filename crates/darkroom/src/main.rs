//! darkroom CLI - idempotent pipeline that writes image dimension metadata
//! for objects landing in a bucket.
//!
//! The two pipeline stages are separate commands so each can be driven by
//! whatever scheduler delivers its input; `run` wires both together for a
//! local end-to-end pass.
//!
//! # Usage
//!
//! ```bash
//! # Turn a storage notification into queue messages
//! darkroom ingest event.json
//!
//! # Process a delivery batch (or the spool written by `ingest`)
//! darkroom process ~/.darkroom/queue.jsonl
//!
//! # Both stages in-process, with redelivery of failed messages
//! darkroom run event-1.json event-2.json --workers 4
//!
//! # View configuration
//! darkroom config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// darkroom - idempotent image metadata pipeline.
#[derive(Parser, Debug)]
#[command(name = "darkroom")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "DARKROOM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Dispatch a storage notification event to the queue spool
    Ingest(cli::ingest::IngestArgs),

    /// Process a delivery batch and print the partial batch response
    Process(cli::process::ProcessArgs),

    /// Run ingestion and processing in-process over notification files
    Run(cli::run::RunArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        Some(path) => darkroom_core::Config::load_from(path)?,
        None => match darkroom_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `darkroom config path`."
                );
                darkroom_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("darkroom v{}", darkroom_core::VERSION);

    match cli.command {
        Commands::Ingest(args) => cli::ingest::execute(args, config).await,
        Commands::Process(args) => cli::process::execute(args, config).await,
        Commands::Run(args) => cli::run::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config).await,
    }
}
