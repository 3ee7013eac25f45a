//! # Offsync Testkit
//!
//! Test utilities for Offsync.
//!
//! This crate provides:
//! - User fixtures and durable temp-file stores
//! - A fault-injecting store wrapper for storage failure paths
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use offsync_storage::RecordStore;
//! use offsync_testkit::prelude::*;
//!
//! let store = TestStore::file();
//! store.upsert_users(&sample_users()).unwrap();
//! assert_eq!(store.reopen().user_count().unwrap(), 5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
