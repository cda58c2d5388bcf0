//! Store configuration and data-root resolution.

use std::path::PathBuf;

/// Persistent volume mount point checked before any fallback.
const DEFAULT_PERSISTENT_MOUNT: &str = "/var/data/ledger";

/// Where the store keeps its documents and audit log.
///
/// Built once at process start and passed into components; nothing in the
/// store reads the environment after construction.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Persistent volume mount, used whenever it exists on the host
    pub persistent_mount: PathBuf,

    /// Explicit data directory, used when the mount is absent
    pub data_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persistent_mount: PathBuf::from(DEFAULT_PERSISTENT_MOUNT),
            data_dir: None,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            persistent_mount: std::env::var("PERSISTENT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_PERSISTENT_MOUNT)),
            data_dir: std::env::var("DATA_DIR").ok().map(PathBuf::from),
        }
    }

    /// Resolve the directory all documents and the audit log live under.
    ///
    /// The persistent mount wins when present; otherwise the configured
    /// directory; otherwise `./data` under the working directory.
    pub fn resolve_data_root(&self) -> PathBuf {
        if self.persistent_mount.exists() {
            tracing::info!(
                "Detected persistent volume at {}",
                self.persistent_mount.display()
            );
            return self.persistent_mount.clone();
        }

        let root = self
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("./data"));
        tracing::warn!(
            "No persistent volume detected, using local path {}",
            root.display()
        );
        root
    }
}
