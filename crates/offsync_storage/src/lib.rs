//! # Offsync Storage
//!
//! Local record store and cache ledger for Offsync.
//!
//! This crate provides the storage seam consumed by the sync coordinator:
//! user records with provenance flags, a ledger of sync bookkeeping
//! entries, live snapshot subscriptions and all-or-nothing transactions
//! spanning both tables.
//!
//! ## Design Principles
//!
//! - Users and ledger entries are independent tables
//! - A transaction publishes both tables together or not at all
//! - Readers never observe a partially applied transaction
//! - Stores must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`LocalStore::in_memory`] - For testing and ephemeral caches
//! - [`LocalStore::open`] - Durable, backed by a CBOR snapshot file
//!
//! ## Example
//!
//! ```rust
//! use offsync_storage::{LocalStore, RecordStore, SyncStore, Timestamp, UserId, UserRecord};
//!
//! let store = LocalStore::in_memory();
//! store
//!     .write(|txn| {
//!         txn.mark_all_offline();
//!         txn.upsert_users(&[UserRecord::new(UserId::new(1), "Ada", "ada@example.com")
//!             .fresh(Timestamp::from_millis(1))])
//!     })
//!     .unwrap();
//! assert_eq!(store.user_count().unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod error;
mod feed;
mod ledger;
mod local;
mod model;
mod snapshot;
mod store;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use error::{StorageError, StorageResult};
pub use feed::{SnapshotFeed, UserWatch};
pub use ledger::CacheLedger;
pub use local::LocalStore;
pub use model::{LedgerEntry, UserFilter, UserId, UserRecord};
pub use snapshot::SnapshotFile;
pub use store::{sorted_users, LedgerStore, RecordStore, SyncStore, Tables, TxnChanges, WriteTxn};
