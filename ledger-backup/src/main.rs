//! Ledger Backup - Main entry point
//!
//! One invocation performs one backup run; an external timer drives the
//! schedule.

use anyhow::Result;
use clap::Parser;
use ledger_backup::archive::TarArchiver;
use ledger_backup::config::BackupConfig;
use ledger_backup::orchestrator::{AbortReason, BackupOrchestrator, RunOutcome};
use ledger_backup::remote::S3ObjectStore;
use ledger_backup::utils;
use ledger_store::StoreConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Back up this directory instead of the resolved data root
    #[arg(short, long)]
    source: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    utils::logger::init(&args.log_level)?;

    let mut config = BackupConfig::from_env();
    if let Some(source) = args.source {
        // Pin resolution to the operator-chosen directory
        config.store = StoreConfig {
            persistent_mount: source.clone(),
            data_dir: Some(source),
        };
    }

    tracing::info!(
        "Starting ledger-backup v{} (system: {})",
        env!("CARGO_PKG_VERSION"),
        config.system_name
    );

    let store = S3ObjectStore::new(&config);
    let orchestrator = BackupOrchestrator::new(config, TarArchiver, store);

    match orchestrator.run().await? {
        RunOutcome::Completed(report) => {
            tracing::info!(
                "Backup stored at {} ({} bytes)",
                report.object_key,
                report.archive_size
            );
        }
        RunOutcome::Aborted(AbortReason::SourceMissing) => {
            tracing::warn!("Backup aborted: source directory not found");
        }
        RunOutcome::Aborted(AbortReason::NothingToArchive) => {
            tracing::warn!("Backup aborted: no targets to archive");
        }
    }

    Ok(())
}
