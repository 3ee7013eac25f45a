//! Clear command implementation.

use super::{open, NoRemote};
use offsync_sync_engine::SyncConfig;
use std::path::Path;
use tracing::info;

/// Runs the clear command.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Clearing cache at {:?}", path);
    let coordinator = open(path, SyncConfig::default(), NoRemote)?;

    let report = coordinator.clear_cache().await?;
    println!(
        "Removed {} users and {} ledger entries",
        report.users_removed, report.ledger_entries_removed
    );

    Ok(())
}
