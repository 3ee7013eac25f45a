//! Property-based test generators using proptest.
//!
//! Provides strategies for generating users that respect the store's
//! provenance invariant.

use offsync_storage::{Timestamp, UserId, UserRecord};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for user ids drawn from a small range so batches overlap.
pub fn user_id_strategy() -> impl Strategy<Value = UserId> {
    (1u64..=32).prop_map(UserId::new)
}

/// Strategy for display names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,8}( [A-Z][a-z]{0,8})?").expect("Invalid regex")
}

/// Strategy for unflagged users as a remote would return them.
pub fn remote_user_strategy() -> impl Strategy<Value = UserRecord> {
    (
        user_id_strategy(),
        name_strategy(),
        prop::option::of("555-0[0-9]{3}"),
        prop::option::of("[a-z]{3,8}\\.example"),
    )
        .prop_map(|(id, name, phone, website)| {
            let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
            let mut record = UserRecord::new(id, name, email);
            record.phone = phone;
            record.website = website;
            record
        })
}

/// Strategy for a remote batch with unique ids.
pub fn remote_batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<UserRecord>> {
    prop::collection::vec(remote_user_strategy(), 0..=max_len).prop_map(|users| {
        let unique: BTreeMap<UserId, UserRecord> =
            users.into_iter().map(|user| (user.id, user)).collect();
        unique.into_values().collect()
    })
}

/// Strategy for users as they may sit in the store.
///
/// Flags are drawn from the three valid combinations.
pub fn stored_user_strategy() -> impl Strategy<Value = UserRecord> {
    (remote_user_strategy(), 0u8..3, 0i64..1_000_000).prop_map(|(user, flags, synced_at)| {
        let synced_at = Timestamp::from_millis(synced_at);
        match flags {
            0 => user,
            1 => {
                let mut record = user.fresh(synced_at);
                record.mark_offline();
                record
            }
            _ => user.fresh(synced_at),
        }
    })
}

/// Strategy for a pre-existing local table with unique ids.
pub fn stored_table_strategy(max_len: usize) -> impl Strategy<Value = Vec<UserRecord>> {
    prop::collection::vec(stored_user_strategy(), 0..=max_len).prop_map(|users| {
        let unique: BTreeMap<UserId, UserRecord> =
            users.into_iter().map(|user| (user.id, user)).collect();
        unique.into_values().collect()
    })
}
