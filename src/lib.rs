//! cardscroll - paginated search cache and sort coordinator
//!
//! cardscroll sits between an infinite-scroll card browser and a remote
//! search API that serves fixed-size pages. It hands the UI small display
//! batches, keeps out-of-order responses from overwriting newer results,
//! and turns sort changes into either a local reorder or a priority search.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use cardscroll::{CacheConfig, Filters, InMemorySearchClient, SearchCache};
//!
//! let client = Arc::new(InMemorySearchClient::numbered(400, 175));
//! let cache = SearchCache::new(client, &CacheConfig::default())?;
//!
//! cache.search("card", Filters::new()).await?;   // first 75 cards
//! cache.load_more().await?;                      // next 75, no fetch
//! ```
//!
//! # Architecture
//!
//! - `cardscroll-core`: shared types, limits and errors
//! - `cardscroll-remote`: the remote search client seam and its implementations
//! - `cardscroll-concurrency`: request tokens and arbitration
//! - `cardscroll-engine`: the cache, the page tracker and the sort coordinator

pub use cardscroll_concurrency::{RequestPhase, RequestToken, SearchRequestCoordinator};
pub use cardscroll_core::{
    Card, Error, FilterValue, Filters, Limits, PaginationState, RemotePage, Result, SearchQuery,
    SortCriteria, SortDirection, SortSpec,
};
pub use cardscroll_engine::{
    BatchFill, CacheConfig, CacheSnapshot, LoadMore, PageConsumptionTracker, SearchCache,
    SearchOutcome, ServerSortPolicy, SortChangeEvent, SortCoordinator, SortOutcome,
    SubscriptionGuard,
};
pub use cardscroll_remote::{
    HttpSearchClient, InMemorySearchClient, RemoteConfig, RemoteSearchClient,
};
