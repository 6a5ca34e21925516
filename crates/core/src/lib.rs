//! Core types for cardscroll
//!
//! This crate defines the foundational types used throughout the system:
//! - Card: one record returned by the remote search API
//! - SortSpec / SortCriteria / SortDirection: server and client ordering
//! - SearchQuery / Filters: immutable search descriptions
//! - RemotePage: one fetched page
//! - PaginationState: public snapshot of pagination progress
//! - Limits: fixed page/batch sizes and timings of a deployment
//! - Error: error taxonomy shared by every layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod search_types;
pub mod sort;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use limits::{
    Limits, DEFAULT_DISPLAY_BATCH_SIZE, DEFAULT_PRIORITY_RELEASE, DEFAULT_PRIORITY_WINDOW,
    DEFAULT_REMOTE_PAGE_SIZE, DEFAULT_SEARCH_SPACING, WILDCARD_QUERY,
};
pub use search_types::{FilterValue, Filters, PaginationState, RemotePage, SearchQuery};
pub use sort::{SortCriteria, SortDirection, SortSpec};
pub use types::Card;
