//! Custom error types for the store.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Staged file for {0} is empty, refusing to overwrite")]
    EmptyStage(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
