//! # tagfeed-core
//!
//! Core types, traits, and abstractions for the tagfeed service.
//!
//! This crate provides the foundational data structures, the store trait
//! contracts, and the pure tag filter engine that other tagfeed crates
//! depend on.

pub mod defaults;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use filter::{
    filter_by_tags, filtered_view, group_chats_by_date, FilterSummary, FilteredView,
    GroupedChats, RecencyBucket,
};
pub use models::*;
pub use traits::*;
