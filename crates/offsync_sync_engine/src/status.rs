//! Coordinator state machine and human-facing sync labels.

use offsync_storage::Timestamp;
use std::fmt;
use std::time::Duration;

/// The current state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No cycle has run yet.
    Idle,
    /// Waiting on the remote fetcher.
    Fetching,
    /// Writing a fetched batch or reading the fallback.
    Reconciling,
    /// The last cycle reconciled a fresh batch.
    Synced,
    /// The last cycle served stale local data.
    Offline,
    /// The last cycle produced no data.
    Error,
}

impl SyncState {
    /// Returns true while a cycle is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Fetching | SyncState::Reconciling)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SyncState::Idle => "idle",
            SyncState::Fetching => "fetching",
            SyncState::Reconciling => "reconciling",
            SyncState::Synced => "synced",
            SyncState::Offline => "offline",
            SyncState::Error => "error",
        };
        f.write_str(text)
    }
}

/// Statistics about refresh cycles.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Refresh cycles started.
    pub cycles_attempted: u64,
    /// Cycles that reconciled a fresh batch.
    pub cycles_successful: u64,
    /// Cycles that fell back to stale data.
    pub stale_fallbacks: u64,
    /// Cycles that produced no data.
    pub failures: u64,
    /// Records received from the remote across all cycles.
    pub records_fetched: u64,
    /// When the last cycle finished.
    pub last_outcome_at: Option<Timestamp>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Freshness label for the last successful sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No sync recorded.
    NeverSynced,
    /// Less than a minute ago.
    JustNow,
    /// Whole minutes ago, under an hour.
    MinutesAgo(u64),
    /// Whole hours ago.
    HoursAgo(u64),
}

impl SyncStatus {
    /// Derives the label from the last sync time as seen at `now`.
    ///
    /// A last sync in the future reads as just now.
    pub fn from_last_sync(last_sync: Option<Timestamp>, now: Timestamp) -> Self {
        let Some(last_sync) = last_sync else {
            return SyncStatus::NeverSynced;
        };
        let age = now.duration_since(last_sync);
        let minutes = age.as_secs() / 60;
        if age < Duration::from_secs(60) {
            SyncStatus::JustNow
        } else if minutes < 60 {
            SyncStatus::MinutesAgo(minutes)
        } else {
            SyncStatus::HoursAgo(minutes / 60)
        }
    }

    /// Returns true if a sync was ever recorded.
    pub fn has_synced(&self) -> bool {
        !matches!(self, SyncStatus::NeverSynced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::NeverSynced => f.write_str("No sync yet"),
            SyncStatus::JustNow => f.write_str("Last sync: Just now"),
            SyncStatus::MinutesAgo(m) => write!(f, "Last sync: {m}m ago"),
            SyncStatus::HoursAgo(h) => write!(f, "Last sync: {h}h ago"),
        }
    }
}
