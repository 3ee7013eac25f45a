//! Store traits and the write transaction shared by all implementations.

use crate::clock::Timestamp;
use crate::error::StorageResult;
use crate::feed::UserWatch;
use crate::model::{LedgerEntry, UserFilter, UserId, UserRecord};
use std::collections::BTreeMap;

/// Query and mutation surface over user records.
///
/// # Invariants
///
/// - Listings are ordered by `name`, ties broken by `id`.
/// - Writes reject records that fail [`UserRecord::validate`].
/// - Every committed write that touches users produces one snapshot on each
///   live [`UserWatch`].
pub trait RecordStore: Send + Sync {
    /// Lists every record.
    fn all_users(&self) -> StorageResult<Vec<UserRecord>> {
        self.users_matching(UserFilter::All)
    }

    /// Lists records passing `filter`.
    fn users_matching(&self, filter: UserFilter) -> StorageResult<Vec<UserRecord>>;

    /// Looks up one record.
    fn user(&self, id: UserId) -> StorageResult<Option<UserRecord>>;

    /// Counts every record.
    fn user_count(&self) -> StorageResult<usize>;

    /// Inserts or replaces records by id.
    fn upsert_users(&self, users: &[UserRecord]) -> StorageResult<()>;

    /// Deletes one record. Returns whether it existed.
    fn delete_user(&self, id: UserId) -> StorageResult<bool>;

    /// Deletes every record. Returns how many were removed.
    fn delete_all_users(&self) -> StorageResult<usize>;

    /// Subscribes to filtered snapshots.
    ///
    /// The current snapshot is delivered first, then one per commit.
    fn watch_users(&self, filter: UserFilter) -> StorageResult<UserWatch>;
}

/// Keyed storage for ledger entries.
///
/// This is the raw table; expiry policy lives in [`crate::CacheLedger`].
pub trait LedgerStore: Send + Sync {
    /// Reads one entry, expired or not.
    fn ledger_entry(&self, key: &str) -> StorageResult<Option<LedgerEntry>>;

    /// Lists every entry ordered by key.
    fn ledger_entries(&self) -> StorageResult<Vec<LedgerEntry>>;

    /// Inserts or replaces an entry by key.
    fn put_ledger_entry(&self, entry: LedgerEntry) -> StorageResult<()>;

    /// Deletes one entry. Returns whether it existed.
    fn delete_ledger_entry(&self, key: &str) -> StorageResult<bool>;

    /// Deletes entries whose expiry is before `now`.
    fn remove_expired_ledger_entries(&self, now: Timestamp) -> StorageResult<usize>;

    /// Deletes every entry.
    fn clear_ledger(&self) -> StorageResult<usize>;
}

/// A store holding both tables with all-or-nothing transactions.
pub trait SyncStore: RecordStore + LedgerStore {
    /// Runs `f` as one transaction over users and ledger.
    ///
    /// If `f` returns `Ok`, its changes become visible together. If it
    /// returns `Err`, or the commit fails, nothing is changed.
    fn write<R, F>(&self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> StorageResult<R>;
}

/// The two tables held by a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    /// Users keyed by id.
    pub users: BTreeMap<UserId, UserRecord>,
    /// Ledger entries keyed by name.
    pub ledger: BTreeMap<String, LedgerEntry>,
}

impl Tables {
    /// Returns users passing `filter` in listing order.
    pub fn users_matching(&self, filter: UserFilter) -> Vec<UserRecord> {
        sorted_users(self.users.values(), filter)
    }
}

/// Sorts records into listing order after applying `filter`.
pub fn sorted_users<'a>(
    users: impl IntoIterator<Item = &'a UserRecord>,
    filter: UserFilter,
) -> Vec<UserRecord> {
    let mut matching: Vec<UserRecord> = users
        .into_iter()
        .filter(|user| filter.matches(user))
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    matching
}

/// Which tables a transaction touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxnChanges {
    /// The user table changed.
    pub users: bool,
    /// The ledger table changed.
    pub ledger: bool,
}

impl TxnChanges {
    /// Returns true if nothing was written.
    pub fn is_empty(&self) -> bool {
        !self.users && !self.ledger
    }
}

/// Mutable view of staged tables inside [`SyncStore::write`].
pub struct WriteTxn<'a> {
    tables: &'a mut Tables,
    changes: TxnChanges,
}

impl<'a> WriteTxn<'a> {
    /// Wraps staged tables. Store implementations call this.
    pub fn new(tables: &'a mut Tables) -> Self {
        Self {
            tables,
            changes: TxnChanges::default(),
        }
    }

    /// Returns which tables were written so far.
    pub fn changes(&self) -> TxnChanges {
        self.changes
    }

    /// Lists staged users passing `filter`.
    pub fn users(&self, filter: UserFilter) -> Vec<UserRecord> {
        self.tables.users_matching(filter)
    }

    /// Looks up one staged user.
    pub fn user(&self, id: UserId) -> Option<&UserRecord> {
        self.tables.users.get(&id)
    }

    /// Demotes every user to offline, keeping it cached.
    ///
    /// Returns how many records were online before.
    pub fn mark_all_offline(&mut self) -> usize {
        let mut demoted = 0;
        for user in self.tables.users.values_mut() {
            if user.is_online {
                demoted += 1;
            }
            user.mark_offline();
        }
        if !self.tables.users.is_empty() {
            self.changes.users = true;
        }
        demoted
    }

    /// Inserts or replaces users by id.
    ///
    /// The whole batch is validated before anything is staged.
    pub fn upsert_users(&mut self, users: &[UserRecord]) -> StorageResult<()> {
        for user in users {
            user.validate()?;
        }
        for user in users {
            self.tables.users.insert(user.id, user.clone());
        }
        if !users.is_empty() {
            self.changes.users = true;
        }
        Ok(())
    }

    /// Deletes one user.
    pub fn delete_user(&mut self, id: UserId) -> bool {
        let removed = self.tables.users.remove(&id).is_some();
        self.changes.users |= removed;
        removed
    }

    /// Deletes every user.
    pub fn clear_users(&mut self) -> usize {
        let removed = self.tables.users.len();
        self.tables.users.clear();
        self.changes.users |= removed > 0;
        removed
    }

    /// Reads one staged ledger entry.
    pub fn ledger_entry(&self, key: &str) -> Option<&LedgerEntry> {
        self.tables.ledger.get(key)
    }

    /// Inserts or replaces a ledger entry.
    pub fn put_ledger_entry(&mut self, entry: LedgerEntry) -> StorageResult<()> {
        entry.validate()?;
        self.tables.ledger.insert(entry.key.clone(), entry);
        self.changes.ledger = true;
        Ok(())
    }

    /// Deletes one ledger entry.
    pub fn delete_ledger_entry(&mut self, key: &str) -> bool {
        let removed = self.tables.ledger.remove(key).is_some();
        self.changes.ledger |= removed;
        removed
    }

    /// Deletes ledger entries expired at `now`.
    pub fn remove_expired_ledger_entries(&mut self, now: Timestamp) -> usize {
        let before = self.tables.ledger.len();
        self.tables.ledger.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - self.tables.ledger.len();
        self.changes.ledger |= removed > 0;
        removed
    }

    /// Deletes every ledger entry.
    pub fn clear_ledger(&mut self) -> usize {
        let removed = self.tables.ledger.len();
        self.tables.ledger.clear();
        self.changes.ledger |= removed > 0;
        removed
    }
}
