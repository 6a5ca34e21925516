//! Session wrapper around the search cache.
//!
//! Holds the `SearchCache` and the single-threaded tokio runtime that drives
//! it. Every cache operation is async; the session blocks on each one so the
//! shell, REPL and pipe loops stay synchronous.

use std::sync::Arc;

use cardscroll_core::{Card, Filters, Result, SortCriteria, SortDirection};
use cardscroll_engine::{CacheSnapshot, LoadMore, SearchCache, SearchOutcome, SortOutcome};
use cardscroll_remote::RemoteSearchClient;
use tokio::runtime::Runtime;

/// Client type the CLI drives: HTTP or the offline corpus
pub type DynClient = Arc<dyn RemoteSearchClient>;

/// Wraps the cache and tracks the runtime it runs on.
pub struct SessionState {
    runtime: Runtime,
    cache: SearchCache<DynClient>,
}

impl SessionState {
    /// Create a new SessionState.
    pub fn new(runtime: Runtime, cache: SearchCache<DynClient>) -> Self {
        Self { runtime, cache }
    }

    /// Run a search.
    pub fn search(&self, text: &str, filters: Filters) -> Result<SearchOutcome> {
        self.runtime.block_on(self.cache.search(text, filters))
    }

    /// Change the sort order of `area`, the cache's own area by default.
    pub fn sort(
        &self,
        area: Option<&str>,
        criteria: SortCriteria,
        direction: SortDirection,
    ) -> Result<SortOutcome> {
        let area = area.unwrap_or_else(|| self.cache.area());
        self.runtime
            .block_on(self.cache.change_sort(area, criteria, direction))
    }

    /// Load the next batch.
    pub fn load_more(&self) -> Result<LoadMore> {
        self.runtime.block_on(self.cache.load_more())
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.cache.snapshot()
    }

    /// Loaded cards in `[offset, offset + limit)`.
    pub fn cards(&self, offset: usize, limit: usize) -> Vec<Card> {
        self.cache
            .cards()
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Build the REPL prompt string.
    pub fn prompt(&self) -> String {
        let snapshot = self.cache.snapshot();
        let state = &snapshot.pagination;
        if state.generation == 0 {
            return "cardscroll> ".to_string();
        }
        let text = if state.last_query.text.trim().is_empty() {
            "*"
        } else {
            state.last_query.text.trim()
        };
        format!(
            "cardscroll:{} [{}/{}]> ",
            text, state.loaded_cards, state.total_cards
        )
    }
}
