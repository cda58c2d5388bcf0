//! Atomic JSON document writes.
//!
//! Documents go to disk through a staged write: serialize, write to a
//! `.tmp` sibling, fsync, verify non-empty, then rename over the target.
//! A reader therefore only ever observes the previous complete document or
//! the new complete document.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

use crate::audit::{AuditLog, AuditOperation};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::Result;

/// Suffix appended to the target path while a write is staged.
const STAGING_SUFFIX: &str = ".tmp";

fn staging_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(STAGING_SUFFIX);
    PathBuf::from(raw)
}

/// Writes JSON documents atomically, recording each success in the audit
/// log.
pub struct DurableWriter {
    audit: AuditLog,
}

impl DurableWriter {
    /// Writer whose audit log lives at the standard location inside the
    /// resolved data root.
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            audit: AuditLog::in_data_root(&config.resolve_data_root()),
        }
    }

    /// Writer with an explicit audit log destination.
    pub fn with_audit(audit: AuditLog) -> Self {
        Self { audit }
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Atomically replace the document at `path` with `value`.
    ///
    /// On success one `SAVE_FILE` entry is appended to the audit log; if
    /// that append fails the write still counts as successful. On failure
    /// the staging file is removed best-effort and the target is left
    /// untouched. No retry.
    pub fn write<T, P>(&self, path: P, value: &T) -> Result<()>
    where
        T: Serialize,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = match serde_json::to_string_pretty(value) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize document for {}: {}", path.display(), e);
                return Err(e.into());
            }
        };

        self.write_text(path, &text)
    }

    fn write_text(&self, path: &Path, text: &str) -> Result<()> {
        let staging = staging_path(path);

        match stage_and_rename(path, &staging, text) {
            Ok(size) => {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());

                if let Err(e) = self.audit.append(
                    AuditOperation::SaveFile,
                    json!({"filename": filename, "size": size}),
                ) {
                    warn!("Audit append failed for {}: {}", path.display(), e);
                }

                Ok(())
            }
            Err(e) => {
                error!("Failed to persist {}: {}", path.display(), e);
                if staging.exists() {
                    if let Err(cleanup) = fs::remove_file(&staging) {
                        warn!(
                            "Failed to remove staging file {}: {}",
                            staging.display(),
                            cleanup
                        );
                    }
                }
                Err(e)
            }
        }
    }
}

fn stage_and_rename(path: &Path, staging: &Path, text: &str) -> Result<u64> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create directory {}: {}", parent.display(), e);
            }
        }
    }

    let file = File::create(staging)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(text.as_bytes())?;
    writer.flush()?;

    // Sync to disk before rename
    writer.get_ref().sync_all()?;

    let size = fs::metadata(staging)?.len();
    if size == 0 {
        return Err(StoreError::EmptyStage(path.display().to_string()));
    }

    fs::rename(staging, path)?;

    Ok(size)
}

/// Read a JSON document back from disk.
pub fn read_json<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}
