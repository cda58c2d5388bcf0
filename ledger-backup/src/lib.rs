//! Ledger Backup Library
//!
//! Archives the ledger data directory and ships it to S3-compatible object
//! storage. One invocation performs one run; scheduling lives outside.

pub mod archive;
pub mod config;
pub mod orchestrator;
pub mod remote;
pub mod utils;

// Re-export commonly used types
pub use config::BackupConfig;
pub use utils::{BackupError, Result};
