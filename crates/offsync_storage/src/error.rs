//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The snapshot file is corrupted or has an unknown layout.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// Encoding a snapshot failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// A record or ledger entry violates a model invariant.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The storage cannot serve requests right now.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Creates an `Unavailable` error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates an `InvalidRecord` error.
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord(message.into())
    }
}
