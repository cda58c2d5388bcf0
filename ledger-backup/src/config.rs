//! Backup configuration, loaded once at startup.

use std::path::PathBuf;

use ledger_store::StoreConfig;

use crate::archive::ArchiveSelection;
use crate::utils::errors::{BackupError, Result};

/// Everything one backup run needs, resolved before any work starts.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Object storage endpoint URL
    pub endpoint: String,

    /// Object storage credentials
    pub access_key_id: String,
    pub secret_access_key: String,

    /// Destination bucket
    pub bucket: String,

    /// Signing region ("auto" for R2-style endpoints)
    pub region: String,

    /// Namespace prefix for object keys
    pub system_name: String,

    /// Optional prefix baked into the archive file name
    pub archive_prefix: Option<String>,

    /// Which parts of the source directory get archived
    pub selection: ArchiveSelection,

    /// Where the archive is staged before upload
    pub staging_dir: PathBuf,

    /// Shared data-root resolution settings
    pub store: StoreConfig,
}

impl BackupConfig {
    /// Load configuration from the environment (and `.env` when present).
    ///
    /// Missing required values are reported by [`validate`](Self::validate),
    /// not here, so a run can log its context before failing.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            endpoint: std::env::var("S3_ENDPOINT").unwrap_or_default(),
            access_key_id: std::env::var("S3_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY").unwrap_or_default(),
            bucket: std::env::var("S3_BUCKET").unwrap_or_default(),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "auto".into()),
            system_name: std::env::var("SYSTEM_NAME").unwrap_or_else(|_| "ledger".into()),
            archive_prefix: std::env::var("ARCHIVE_PREFIX").ok().filter(|v| !v.is_empty()),
            selection: std::env::var("BACKUP_SOURCES")
                .map(|v| parse_selection(&v))
                .unwrap_or_default(),
            staging_dir: std::env::temp_dir(),
            store: StoreConfig::from_env(),
        }
    }

    /// Check that every required value is present, naming all that are not.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.endpoint.is_empty() {
            missing.push("S3_ENDPOINT");
        }
        if self.access_key_id.is_empty() {
            missing.push("S3_ACCESS_KEY_ID");
        }
        if self.secret_access_key.is_empty() {
            missing.push("S3_SECRET_ACCESS_KEY");
        }
        if self.bucket.is_empty() {
            missing.push("S3_BUCKET");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BackupError::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Parse a `BACKUP_SOURCES` value: `*` archives the whole source tree, a
/// comma-separated list restricts the run to those subdirectories, and an
/// empty value keeps the default allow-list.
fn parse_selection(value: &str) -> ArchiveSelection {
    let value = value.trim();
    if value == "*" {
        return ArchiveSelection::WholeTree;
    }

    let names: Vec<String> = value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if names.is_empty() {
        ArchiveSelection::default()
    } else {
        ArchiveSelection::Subtrees(names)
    }
}
