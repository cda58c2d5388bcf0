//! Ledger Store Library
//!
//! Durable JSON document persistence with an append-only audit trail.

pub mod audit;
pub mod config;
pub mod error;
pub mod writer;

// Re-export commonly used types
pub use audit::{AuditEntry, AuditError, AuditLog, AuditOperation};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use writer::DurableWriter;
