//! LJPics Library
//!
//! Resolves LiveJournal usernames to cached display names and userpics,
//! refetching FOAF documents once cached rows are a week old.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod identity;
pub mod present;
pub mod refresh;
