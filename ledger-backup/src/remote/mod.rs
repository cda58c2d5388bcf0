//! Remote object storage client and uploader.

pub mod s3;
pub mod sign;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::utils::errors::Result;

pub use s3::S3ObjectStore;

/// Single-shot write access to a remote object store.
///
/// One call, one object; no multipart, no resume.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()>;
}

/// Object captured by [`MemoryObjectStore`].
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// In-memory store for tests and dry runs.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// Uploads a finished archive and removes the local artifact.
pub struct RemoteUploader<S: ObjectStore> {
    store: S,
}

impl<S: ObjectStore> RemoteUploader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read the artifact fully, push it to the store, then delete the local
    /// copy. The local file is removed on every exit path, read failures
    /// included, so a failed run never leaves artifacts behind in the
    /// staging directory.
    pub async fn upload(&self, archive_path: &Path, key: &str) -> Result<()> {
        let result = match tokio::fs::read(archive_path).await {
            Ok(body) => {
                let size = body.len();
                self.store
                    .put_object(key, Bytes::from(body), "application/gzip")
                    .await
                    .map(|_| size)
            }
            Err(e) => Err(e.into()),
        };

        if let Err(e) = tokio::fs::remove_file(archive_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove local archive {}: {}",
                    archive_path.display(),
                    e
                );
            }
        }

        let size = result?;
        info!("Uploaded archive to {} ({} bytes)", key, size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::BackupError;
    use std::fs;
    use tempfile::TempDir;

    struct FailingStore;

    impl ObjectStore for FailingStore {
        async fn put_object(&self, _key: &str, _body: Bytes, _content_type: &str) -> Result<()> {
            Err(BackupError::Remote("simulated outage".to_string()))
        }
    }

    #[tokio::test]
    async fn test_upload_stores_object_and_removes_local_file() -> anyhow::Result<()> {
        let staging = TempDir::new()?;
        let archive = staging.path().join("backup.tar.gz");
        fs::write(&archive, b"archive bytes")?;

        let store = MemoryObjectStore::new();
        let uploader = RemoteUploader::new(store.clone());

        uploader.upload(&archive, "ledger/backup.tar.gz").await?;

        let stored = store.get("ledger/backup.tar.gz").await.unwrap();
        assert_eq!(stored.body.as_ref(), b"archive bytes");
        assert_eq!(stored.content_type, "application/gzip");
        assert!(!archive.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_upload_still_removes_local_file() -> anyhow::Result<()> {
        let staging = TempDir::new()?;
        let archive = staging.path().join("backup.tar.gz");
        fs::write(&archive, b"archive bytes")?;

        let uploader = RemoteUploader::new(FailingStore);
        let result = uploader.upload(&archive, "ledger/backup.tar.gz").await;

        assert!(matches!(result, Err(BackupError::Remote(_))));
        assert!(!archive.exists());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_read_still_removes_local_file() -> anyhow::Result<()> {
        let staging = TempDir::new()?;
        let archive = staging.path().join("backup.tar.gz");

        // A dangling link makes the read fail while leaving an entry to clean up
        std::os::unix::fs::symlink(staging.path().join("missing"), &archive)?;

        let store = MemoryObjectStore::new();
        let uploader = RemoteUploader::new(store.clone());
        let result = uploader.upload(&archive, "ledger/backup.tar.gz").await;

        assert!(matches!(result, Err(BackupError::Io(_))));
        assert_eq!(store.object_count().await, 0);
        assert!(fs::symlink_metadata(&archive).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_an_io_error() {
        let uploader = RemoteUploader::new(MemoryObjectStore::new());
        let result = uploader
            .upload(Path::new("/nonexistent/backup.tar.gz"), "k")
            .await;

        assert!(matches!(result, Err(BackupError::Io(_))));
    }
}
