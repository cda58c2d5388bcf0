//! Utility modules for the backup unit.

pub mod errors;
pub mod logger;

pub use errors::{BackupError, Result};
