//! Error types for the sync engine.

use offsync_storage::StorageError;
use std::fmt;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// A transient failure reported by the remote fetcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transient network error: {message}")]
pub struct FetchError {
    /// Error message.
    pub message: String,
}

impl FetchError {
    /// Creates a fetch error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote could not be reached and there is no local fallback.
    #[error("no connectivity and empty cache")]
    EmptyCache {
        /// The fetch failure that triggered the fallback.
        cause: FetchError,
    },

    /// Reading local storage failed.
    #[error("storage read failure: {0}")]
    StorageRead(#[source] StorageError),

    /// Writing local storage failed.
    #[error("storage write failure: {0}")]
    StorageWrite(#[source] StorageError),
}

impl SyncError {
    /// Returns true if retrying later can succeed without local repair.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::EmptyCache { .. })
    }

    /// Returns the caller-facing failure category.
    pub fn reason(&self) -> FailureReason {
        match self {
            SyncError::EmptyCache { .. } => FailureReason::NoConnectivityEmptyCache,
            SyncError::StorageRead(_) => FailureReason::StorageRead,
            SyncError::StorageWrite(_) => FailureReason::StorageWrite,
        }
    }
}

/// Why a refresh produced no usable data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The remote is unreachable and nothing is cached.
    NoConnectivityEmptyCache,
    /// Local storage could not be read.
    StorageRead,
    /// Local storage could not be written.
    StorageWrite,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::NoConnectivityEmptyCache => "no connectivity and empty cache",
            FailureReason::StorageRead => "storage read failure",
            FailureReason::StorageWrite => "storage write failure",
        };
        f.write_str(text)
    }
}
