//! # Offsync Sync Engine
//!
//! Offline-first refresh coordinator for Offsync.
//!
//! This crate provides:
//! - The refresh cycle (read local, fetch remote, reconcile or fall back)
//! - Staleness queries and a human-facing sync status label
//! - Cache reset and ledger expiry sweeps
//! - A remote fetcher abstraction with scripted and simulated implementations
//!
//! ## Architecture
//!
//! The local store is authoritative for reads. A refresh tries to replace
//! it with the remote's view:
//! 1. Read the local snapshot
//! 2. Fetch the remote batch
//! 3. On success, demote every local record, write the batch and stamp the
//!    ledger in one transaction
//! 4. On failure, serve the local snapshot as stale data
//!
//! ## Key Invariants
//!
//! - Records absent from a fetch are demoted, never deleted
//! - A record that is online is always cached
//! - A failed fetch never mutates the store
//! - Refreshes and cache clears on one coordinator never interleave

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
mod fetcher;
mod outcome;
mod simulated;
mod status;

pub use config::{SyncConfig, DEFAULT_STALE_AFTER, LAST_SYNC_KEY};
pub use coordinator::SyncCoordinator;
pub use error::{FailureReason, FetchError, SyncError, SyncResult};
pub use fetcher::{FetchResult, RemoteFetcher, ScriptedFetcher};
pub use outcome::{ClearReport, SyncOutcome};
pub use simulated::{demo_roster, SimulatedFetcher, SimulatedFetcherConfig, SIMULATED_FAILURE_MESSAGE};
pub use status::{SyncState, SyncStats, SyncStatus};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
