//! Backup run state machine.
//!
//! One run walks a fixed sequence: resolve the source directory, validate
//! configuration, discover targets, compress, upload, clean up. Two early
//! exits are outcomes rather than errors: a missing source directory and an
//! empty target set both end the run without failing the process.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::archive::{self, Archiver};
use crate::config::BackupConfig;
use crate::remote::{ObjectStore, RemoteUploader};
use crate::utils::errors::Result;

/// Why a run stopped before producing an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The resolved source directory does not exist
    SourceMissing,
    /// No configured target exists under the source directory
    NothingToArchive,
}

/// Final state of one backup run.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    Aborted(AbortReason),
}

/// Facts about a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub object_key: String,
    pub archive_size: u64,
    pub targets: Vec<PathBuf>,
}

pub struct BackupOrchestrator<A, S>
where
    A: Archiver,
    S: ObjectStore,
{
    config: BackupConfig,
    archiver: A,
    uploader: RemoteUploader<S>,
}

impl<A, S> BackupOrchestrator<A, S>
where
    A: Archiver,
    S: ObjectStore,
{
    pub fn new(config: BackupConfig, archiver: A, store: S) -> Self {
        Self {
            config,
            archiver,
            uploader: RemoteUploader::new(store),
        }
    }

    /// Execute one backup run, single attempt, no retries.
    pub async fn run(&self) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let started = std::time::Instant::now();
        info!(run_id = %run_id, "Starting backup run");

        let source_dir = self.config.store.resolve_data_root();
        if !source_dir.exists() {
            warn!(
                run_id = %run_id,
                "Source directory {} does not exist, nothing to back up",
                source_dir.display()
            );
            return Ok(RunOutcome::Aborted(AbortReason::SourceMissing));
        }

        // Credentials are checked before any archive work is spent
        self.config.validate()?;

        info!(run_id = %run_id, "Checking backup sources under {}", source_dir.display());
        let targets = archive::discover_targets(&source_dir, &self.config.selection)?;
        if targets.is_empty() {
            warn!(
                run_id = %run_id,
                "No backup targets found under {}, aborting",
                source_dir.display()
            );
            return Ok(RunOutcome::Aborted(AbortReason::NothingToArchive));
        }
        info!(run_id = %run_id, "Found {} target(s): {:?}", targets.len(), targets);

        let date = chrono::Utc::now().date_naive();
        let filename = archive::archive_filename(self.config.archive_prefix.as_deref(), date);
        let archive_path = self.config.staging_dir.join(&filename);

        let archive_size = match self
            .archiver
            .build(&source_dir, &targets, &archive_path)
            .await
        {
            Ok(size) => size,
            Err(e) => {
                error!(run_id = %run_id, "Archive creation failed: {}", e);
                remove_if_present(&archive_path).await;
                return Err(e);
            }
        };
        info!(
            run_id = %run_id,
            "Archive created: {} ({} bytes, {:.2} MB)",
            archive_path.display(),
            archive_size,
            archive_size as f64 / (1024.0 * 1024.0)
        );

        let object_key = format!("{}/{}", self.config.system_name, filename);
        info!(
            run_id = %run_id,
            "Uploading to bucket {} as {}",
            self.config.bucket,
            object_key
        );
        // The uploader removes the local artifact on both outcomes
        self.uploader.upload(&archive_path, &object_key).await?;

        info!(
            run_id = %run_id,
            "Backup run completed in {:.1}s: {}",
            started.elapsed().as_secs_f64(),
            object_key
        );

        Ok(RunOutcome::Completed(RunReport {
            object_key,
            archive_size,
            targets,
        }))
    }
}

async fn remove_if_present(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove partial archive {}: {}", path.display(), e);
        }
    }
}
