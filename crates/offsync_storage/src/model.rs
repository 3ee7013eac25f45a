//! Record and ledger entry types.

use crate::clock::Timestamp;
use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a user record.
///
/// Assigned by the remote source and never reused for another user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl UserId {
    /// Creates a new user ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One synchronizable user held in the local store.
///
/// # Invariants
///
/// - `is_online` implies `is_cached`: anything freshly fetched is persisted.
/// - `id` never changes once the record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Identity key.
    pub id: UserId,
    /// Display name. Listings are ordered by this field.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Optional website.
    pub website: Option<String>,
    /// Present in the most recent successful remote fetch.
    pub is_online: bool,
    /// Backed by local storage.
    pub is_cached: bool,
    /// When this record was last reconciled from the remote.
    pub last_sync_time: Option<Timestamp>,
}

impl UserRecord {
    /// Creates a record with no provenance flags set.
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            phone: None,
            website: None,
            is_online: false,
            is_cached: false,
            last_sync_time: None,
        }
    }

    /// Sets the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the website.
    #[must_use]
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    /// Returns a copy stamped as freshly reconciled at `now`.
    #[must_use]
    pub fn fresh(mut self, now: Timestamp) -> Self {
        self.is_online = true;
        self.is_cached = true;
        self.last_sync_time = Some(now);
        self
    }

    /// Demotes the record to a retained local copy.
    pub fn mark_offline(&mut self) {
        self.is_online = false;
        self.is_cached = true;
    }

    /// Checks the provenance invariant.
    pub fn validate(&self) -> StorageResult<()> {
        if self.is_online && !self.is_cached {
            return Err(StorageError::invalid_record(format!(
                "user {} is online but not cached",
                self.id
            )));
        }
        Ok(())
    }
}

/// Predicate for record listings and live queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserFilter {
    /// Every record.
    #[default]
    All,
    /// Records present in the latest successful fetch.
    Online,
    /// Records backed by local storage.
    Cached,
}

impl UserFilter {
    /// Returns true if `record` passes this filter.
    pub fn matches(self, record: &UserRecord) -> bool {
        match self {
            UserFilter::All => true,
            UserFilter::Online => record.is_online,
            UserFilter::Cached => record.is_cached,
        }
    }
}

/// Sync bookkeeping entry, independent of user records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Logical cache name, e.g. `last_sync_time`.
    pub key: String,
    /// Opaque payload.
    pub payload: String,
    /// When the entry was written.
    pub created_at: Timestamp,
    /// After this instant the entry reads as absent.
    pub expires_at: Option<Timestamp>,
}

impl LedgerEntry {
    /// Creates a non-expiring entry.
    pub fn new(key: impl Into<String>, payload: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            created_at,
            expires_at: None,
        }
    }

    /// Sets the expiry.
    #[must_use]
    pub fn with_expiry(mut self, expires_at: Option<Timestamp>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Returns true if the entry expired before `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expiry| expiry < now)
    }

    /// Checks that the key is usable.
    pub fn validate(&self) -> StorageResult<()> {
        if self.key.trim().is_empty() {
            return Err(StorageError::invalid_record("ledger key cannot be empty"));
        }
        Ok(())
    }
}
