//! Archive target discovery and artifact construction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::NaiveDate;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::utils::errors::{BackupError, Result};

/// Which parts of the source directory go into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSelection {
    /// Only these named top-level subdirectories, skipping absent ones
    Subtrees(Vec<String>),
    /// Every top-level entry of the source directory
    WholeTree,
}

impl Default for ArchiveSelection {
    fn default() -> Self {
        Self::Subtrees(vec!["data".to_string(), "uploads".to_string()])
    }
}

/// Find the archive targets that exist under `source_dir`.
///
/// Returned paths are relative to `source_dir`, in deterministic order.
/// Absent allow-listed entries are skipped with a warning; an empty result
/// means there is nothing to archive.
pub fn discover_targets(source_dir: &Path, selection: &ArchiveSelection) -> Result<Vec<PathBuf>> {
    match selection {
        ArchiveSelection::Subtrees(names) => {
            let mut targets = Vec::new();
            for name in names {
                let candidate = source_dir.join(name);
                if candidate.exists() {
                    targets.push(PathBuf::from(name));
                } else {
                    warn!("Skipping missing backup source: {}", candidate.display());
                }
            }
            Ok(targets)
        }
        ArchiveSelection::WholeTree => {
            let mut targets: Vec<PathBuf> = std::fs::read_dir(source_dir)?
                .filter_map(|e| e.ok())
                .map(|e| PathBuf::from(e.file_name()))
                .collect();
            targets.sort();
            Ok(targets)
        }
    }
}

/// Name of the artifact produced for a given run date.
pub fn archive_filename(prefix: Option<&str>, date: NaiveDate) -> String {
    let stamp = date.format("%Y-%m-%d");
    match prefix {
        Some(prefix) => format!("{}-backup-{}.tar.gz", prefix, stamp),
        None => format!("backup-{}.tar.gz", stamp),
    }
}

/// Builds one compressed artifact from a set of targets.
///
/// Entry paths inside the artifact are relative to `source_dir`, never
/// absolute, so a restore can unpack onto any location.
#[allow(async_fn_in_trait)]
pub trait Archiver {
    /// Write the artifact to `dest` and return its size in bytes.
    async fn build(&self, source_dir: &Path, targets: &[PathBuf], dest: &Path) -> Result<u64>;
}

/// Production archiver that shells out to the system `tar`.
pub struct TarArchiver;

impl Archiver for TarArchiver {
    async fn build(&self, source_dir: &Path, targets: &[PathBuf], dest: &Path) -> Result<u64> {
        info!(
            "Compressing {} target(s) into {}",
            targets.len(),
            dest.display()
        );

        // Running from the source directory keeps entry paths relative
        let mut cmd = tokio::process::Command::new("tar");
        cmd.arg("-czf").arg(dest).current_dir(source_dir);
        for target in targets {
            cmd.arg(target);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| BackupError::Archive(format!("failed to run tar: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let _ = tokio::fs::remove_file(dest).await;
            return Err(BackupError::Archive(format!(
                "tar exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(tokio::fs::metadata(dest).await?.len())
    }
}

/// Archiver that builds a gzip-compressed JSON entry map in process.
///
/// The artifact holds `{relative path: base64 bytes}` instead of a tarball,
/// so runs and tests never depend on an external `tar` binary.
/// [`read_entries`] decodes an artifact back.
pub struct InMemoryArchiver;

impl Archiver for InMemoryArchiver {
    async fn build(&self, source_dir: &Path, targets: &[PathBuf], dest: &Path) -> Result<u64> {
        let source = source_dir.to_path_buf();
        let targets = targets.to_vec();

        // Directory walk and file reads are blocking
        let entries = tokio::task::spawn_blocking(move || {
            let mut entries = BTreeMap::new();
            for target in &targets {
                collect_entries(&source, &source.join(target), &mut entries)?;
            }
            Ok::<_, BackupError>(entries)
        })
        .await
        .map_err(|e| BackupError::Archive(format!("archive task failed: {}", e)))??;

        let json = serde_json::to_vec(&entries)?;
        let mut encoder = async_compression::tokio::bufread::GzipEncoder::new(&json[..]);
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await?;

        tokio::fs::write(dest, &compressed).await?;
        Ok(compressed.len() as u64)
    }
}

fn collect_entries(
    source_dir: &Path,
    root: &Path,
    entries: &mut BTreeMap<String, String>,
) -> Result<()> {
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| BackupError::Archive(format!("walk failed: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        let bytes = std::fs::read(entry.path())?;
        entries.insert(relative, STANDARD.encode(bytes));
    }

    Ok(())
}

/// Decode an in-memory artifact back into its entries.
pub async fn read_entries(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut decoder = async_compression::tokio::bufread::GzipDecoder::new(bytes);
    let mut json = Vec::new();
    decoder.read_to_end(&mut json).await?;

    let encoded: BTreeMap<String, String> = serde_json::from_slice(&json)?;
    let mut entries = BTreeMap::new();
    for (path, data) in encoded {
        let raw = STANDARD
            .decode(data.as_bytes())
            .map_err(|e| BackupError::Archive(format!("invalid entry encoding: {}", e)))?;
        entries.insert(path, raw);
    }

    Ok(entries)
}
