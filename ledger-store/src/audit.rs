//! Append-only audit trail.
//!
//! Every durable write is recorded as one JSON line in an append-only log
//! file, in write order. Failures surface as `AuditError` so call sites can
//! log and continue; an audit failure must never take down the data write
//! it describes.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the audit log inside the data root.
pub const AUDIT_FILE_NAME: &str = "audit.jsonl";

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Operation recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOperation {
    SaveFile,
}

/// One line of the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: AuditOperation,
    pub details: serde_json::Value,
}

impl AuditEntry {
    pub fn new(operation: AuditOperation, details: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            details,
        }
    }
}

/// Writes audit entries to a line-delimited JSON log file.
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Audit log placed at its standard location inside `data_root`.
    pub fn in_data_root(data_root: &Path) -> Self {
        Self::new(data_root.join(AUDIT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Append one entry as a JSON line, flushed immediately.
    ///
    /// Callers on the write path are expected to log the error and move on;
    /// the entry describes a write that already succeeded.
    pub fn append(
        &self,
        operation: AuditOperation,
        details: serde_json::Value,
    ) -> Result<(), AuditError> {
        if let Some(parent) = self.log_path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    tracing::warn!(
                        "Failed to create audit log directory {}: {}",
                        parent.display(),
                        e
                    );
                }
            }
        }

        let entry = AuditEntry::new(operation, details);
        let json = serde_json::to_string(&entry)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        writeln!(file, "{}", json)?;
        file.flush()?;

        Ok(())
    }

    /// Read the log back, oldest entry first.
    pub fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read_back() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let log = AuditLog::in_data_root(temp_dir.path());

        log.append(
            AuditOperation::SaveFile,
            json!({"filename": "clients.json", "size": 120}),
        )
        .unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, AuditOperation::SaveFile);
        assert_eq!(entries[0].details["filename"], "clients.json");
        assert_eq!(entries[0].details["size"], 120);

        Ok(())
    }

    #[test]
    fn test_entries_keep_write_order() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let log = AuditLog::in_data_root(temp_dir.path());

        for i in 0..5 {
            log.append(AuditOperation::SaveFile, json!({"seq": i})).unwrap();
        }

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 5);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.details["seq"], i);
        }

        Ok(())
    }

    #[test]
    fn test_operation_wire_format() {
        let entry = AuditEntry::new(AuditOperation::SaveFile, json!({}));
        let line = serde_json::to_string(&entry).unwrap();
        assert!(line.contains(r#""operation":"SAVE_FILE""#));
    }

    #[test]
    fn test_missing_log_reads_empty() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let log = AuditLog::in_data_root(temp_dir.path());

        assert!(log.entries().unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn test_append_creates_parent_directory() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let log = AuditLog::new(temp_dir.path().join("nested").join(AUDIT_FILE_NAME));

        log.append(AuditOperation::SaveFile, json!({"filename": "a.json"}))
            .unwrap();

        assert_eq!(log.entries().unwrap().len(), 1);
        Ok(())
    }
}
