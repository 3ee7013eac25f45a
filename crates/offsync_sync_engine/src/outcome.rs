//! Results reported to callers of the coordinator.

use crate::error::{FailureReason, FetchError, SyncError};
use offsync_storage::UserRecord;

/// Result of one refresh cycle.
///
/// A stale fallback is not an error: callers get usable records along with
/// the fetch failure that forced the fallback.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The remote batch was reconciled into the store.
    Success {
        /// The fetched batch as stored, stamped online and cached.
        records: Vec<UserRecord>,
    },
    /// The remote was unreachable; the local snapshot is returned unchanged.
    SuccessWithStaleData {
        /// The local records at the time of the failure.
        records: Vec<UserRecord>,
        /// The fetch failure.
        cause: FetchError,
    },
    /// No usable data could be produced.
    Failure(SyncError),
}

impl SyncOutcome {
    /// Returns true for a fresh reconciliation.
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success { .. })
    }

    /// Returns true when stale local data was served.
    pub fn is_stale(&self) -> bool {
        matches!(self, SyncOutcome::SuccessWithStaleData { .. })
    }

    /// Returns true when no data was produced.
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failure(_))
    }

    /// Returns the records carried by a successful or stale outcome.
    pub fn records(&self) -> Option<&[UserRecord]> {
        match self {
            SyncOutcome::Success { records } | SyncOutcome::SuccessWithStaleData { records, .. } => {
                Some(records)
            }
            SyncOutcome::Failure(_) => None,
        }
    }

    /// Returns the failure category, if this is a failure.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            SyncOutcome::Failure(err) => Some(err.reason()),
            _ => None,
        }
    }

    /// Returns the error, if this is a failure.
    pub fn error(&self) -> Option<&SyncError> {
        match self {
            SyncOutcome::Failure(err) => Some(err),
            _ => None,
        }
    }

    /// Short label for logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Success { .. } => "success",
            SyncOutcome::SuccessWithStaleData { .. } => "stale",
            SyncOutcome::Failure(_) => "failure",
        }
    }
}

/// What a cache clear removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// User records deleted.
    pub users_removed: usize,
    /// Ledger entries deleted.
    pub ledger_entries_removed: usize,
}
