//! Configuration for the sync coordinator.

use std::time::Duration;

/// Ledger key under which the last successful sync time is recorded.
pub const LAST_SYNC_KEY: &str = "last_sync_time";

/// Default staleness threshold.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(2 * 60);

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Age after which local data counts as stale.
    pub stale_after: Duration,
    /// Lifetime of the last-sync ledger entry. `None` (the default) never
    /// expires; with a TTL the last sync time reads as absent once it lapses.
    pub ledger_ttl: Option<Duration>,
    /// Ledger key holding the last successful sync time.
    pub last_sync_key: String,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            stale_after: DEFAULT_STALE_AFTER,
            ledger_ttl: None,
            last_sync_key: LAST_SYNC_KEY.to_string(),
        }
    }

    /// Sets the staleness threshold.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Sets the last-sync entry lifetime.
    pub fn with_ledger_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ledger_ttl = ttl;
        self
    }

    /// Sets the ledger key for the last sync time.
    pub fn with_last_sync_key(mut self, key: impl Into<String>) -> Self {
        self.last_sync_key = key.into();
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
