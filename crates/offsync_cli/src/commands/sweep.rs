//! Sweep command implementation.

use super::{open, NoRemote};
use offsync_sync_engine::SyncConfig;
use std::path::Path;
use tracing::info;

/// Runs the sweep command.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Sweeping expired ledger entries at {:?}", path);
    let coordinator = open(path, SyncConfig::default(), NoRemote)?;

    let removed = coordinator.sweep_ledger().await?;
    println!("Removed {removed} expired ledger entries");

    Ok(())
}
