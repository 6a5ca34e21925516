//! Search cache engine for cardscroll
//!
//! This crate ties the lower layers together:
//! - PageConsumptionTracker: display batches out of fixed-size remote pages
//! - SortCoordinator: per-area sort state and change broadcasts
//! - SearchCache: search / load more / change sort / subscribe
//! - CacheConfig: `cardscroll.toml`
//!
//! The cache is the only component that knows about:
//! - Committing fetched pages into the visible state
//! - Turning sort changes into priority searches or in-memory reorders

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod pagination;
pub mod sort;

pub use cache::{CacheSnapshot, LoadMore, SearchCache, SearchOutcome, SortOutcome};
pub use config::{CacheConfig, CONFIG_FILE_NAME, DEFAULT_AREA};
pub use pagination::{BatchFill, Consumption, PageConsumptionTracker};
pub use sort::{
    ServerSortPolicy, SortCallback, SortChangeEvent, SortCoordinator, SubscriptionGuard,
    SubscriptionId,
};
