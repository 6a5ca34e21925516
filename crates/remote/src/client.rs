//! Remote search client trait

use async_trait::async_trait;
use cardscroll_core::{RemotePage, Result, SearchQuery};

/// Adapter that turns one (query, page) pair into one remote fetch
///
/// Implementations hold no pagination state and perform no retries; retry
/// policy belongs to the caller. The fetch is the only suspension point in
/// the whole search pipeline.
///
/// # Errors
///
/// - `Network` on transport failure
/// - `InvalidQuery` when the query is empty or rejected by the API
#[async_trait]
pub trait RemoteSearchClient: Send + Sync {
    /// Fetch one page of results for `query`
    ///
    /// # Arguments
    ///
    /// * `query` - The search to run; encoded with `SearchQuery::remote_query_text`.
    /// * `page` - 1-based page number.
    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<RemotePage>;

    /// Client name for logging
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: RemoteSearchClient + ?Sized> RemoteSearchClient for std::sync::Arc<T> {
    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<RemotePage> {
        (**self).fetch_page(query, page).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
