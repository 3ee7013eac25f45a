//! Test fixtures and store helpers.
//!
//! Provides ready-made users and durable stores in temporary directories.

use offsync_storage::{LocalStore, Timestamp, UserId, UserRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Creates an unflagged user with an email derived from `name`.
pub fn user(id: u64, name: &str) -> UserRecord {
    let local = name.to_lowercase().replace(' ', ".");
    UserRecord::new(UserId::new(id), name, format!("{local}@example.com"))
}

/// Creates a user as it sits in the store after going offline.
pub fn cached_user(id: u64, name: &str, synced_at: Timestamp) -> UserRecord {
    let mut record = user(id, name).fresh(synced_at);
    record.mark_offline();
    record
}

/// Five unflagged users with distinct names.
pub fn sample_users() -> Vec<UserRecord> {
    vec![
        user(1, "Ada Lovelace").with_phone("555-0001"),
        user(2, "Alan Turing").with_website("turing.example"),
        user(3, "Barbara Liskov"),
        user(4, "Edsger Dijkstra").with_phone("555-0004"),
        user(5, "Grace Hopper").with_website("hopper.example"),
    ]
}

/// Returns the raw ids of `records`, in order.
pub fn ids(records: &[UserRecord]) -> Vec<u64> {
    records.iter().map(|record| record.id.as_u64()).collect()
}

/// A durable test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Arc<LocalStore>,
    path: PathBuf,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestStore {
    /// Creates a durable store in a fresh temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("cache").join("offsync.cbor");
        let store = LocalStore::open(&path).expect("Failed to open local store");
        Self {
            store: Arc::new(store),
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a second store over the same snapshot file.
    pub fn reopen(&self) -> LocalStore {
        LocalStore::open(&self.path).expect("Failed to reopen local store")
    }
}

impl std::ops::Deref for TestStore {
    type Target = LocalStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary durable store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&LocalStore, &Path) -> R,
{
    let test_store = TestStore::file();
    f(&test_store.store, test_store.path())
}
