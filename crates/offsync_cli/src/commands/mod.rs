//! CLI command implementations.

pub mod clear;
pub mod list;
pub mod simulate;
pub mod status;
pub mod sweep;
pub mod sync;

use chrono::{DateTime, Utc};
use offsync_storage::LocalStore;
use offsync_sync_engine::{FetchError, FetchResult, RemoteFetcher, SyncConfig, SyncCoordinator};
use std::path::Path;
use std::sync::Arc;

/// Fetcher for commands that never contact the remote.
pub struct NoRemote;

impl RemoteFetcher for NoRemote {
    async fn fetch(&self) -> FetchResult {
        Err(FetchError::new("remote disabled for this command"))
    }
}

/// Opens the snapshot at `path` and builds a coordinator over it.
pub fn open<F: RemoteFetcher>(
    path: &Path,
    config: SyncConfig,
    fetcher: F,
) -> Result<SyncCoordinator<LocalStore, F>, Box<dyn std::error::Error>> {
    let store = LocalStore::open(path)?;
    Ok(SyncCoordinator::new(
        config,
        Arc::new(store),
        fetcher,
        offsync_storage::SystemClock,
    ))
}

/// Formats an epoch-millisecond timestamp for display.
pub fn format_millis(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{millis} ms"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch_millis() {
        assert_eq!(format_millis(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_millis(1_700_000_000_000), "2023-11-14 22:13:20 UTC");
        assert_eq!(format_millis(951_782_400_000), "2000-02-29 00:00:00 UTC");
    }

    #[tokio::test]
    async fn no_remote_always_fails() {
        assert!(NoRemote.fetch().await.is_err());
    }
}
