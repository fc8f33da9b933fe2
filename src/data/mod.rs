//! Core data models for LJPics
//!
//! This module contains the cached profile record, the person records parsed
//! out of FOAF documents, and the clients used to fetch them.

pub mod client;
pub mod foaf;

pub use client::{FetchError, FoafClient, ProfileSource};
pub use foaf::{FoafDocument, PersonNode};

use serde::{Deserialize, Serialize};

/// A person found in a FOAF document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// LiveJournal username as published in the document
    pub nick: String,
    /// Display name, if the document has one
    pub name: Option<String>,
    /// Userpic URL, if the document has one
    pub image: Option<String>,
}

/// One cached row per username
///
/// Missing values are stored as empty strings, never as NULL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProfile {
    /// Canonical username, the primary key
    pub identity: String,
    /// Display name (may be empty)
    pub display_name: String,
    /// Userpic URL (may be empty)
    pub image_url: String,
    /// Administrative suppression flag. Blocked rows are never refetched.
    pub blocked: bool,
    /// When the row was last refreshed, in epoch seconds
    pub refreshed_at: i64,
}

impl CachedProfile {
    /// Row recording that a fetch happened but produced nothing usable.
    pub fn empty(identity: impl Into<String>, refreshed_at: i64) -> Self {
        Self {
            identity: identity.into(),
            display_name: String::new(),
            image_url: String::new(),
            blocked: false,
            refreshed_at,
        }
    }

    /// Row built from a parsed person.
    pub fn from_person(person: &Person, refreshed_at: i64) -> Self {
        Self {
            identity: person.nick.clone(),
            display_name: person.name.clone().unwrap_or_default(),
            image_url: person.image.clone().unwrap_or_default(),
            blocked: false,
            refreshed_at,
        }
    }

    /// True if neither a name nor an image is known.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_empty() && self.image_url.is_empty()
    }
}
