//! Cache module for storing resolved profiles
//!
//! This module provides the profile store: one SQLite row per username,
//! written on every fetch attempt and read back on every lookup. Freshness is
//! decided by the resolver in [`crate::refresh`], not by the store.

mod store;

pub use store::{profile_from_row, ProfileStore, StoreError};
