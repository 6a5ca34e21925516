//! Corpus-backed search client
//!
//! Serves pages out of a fixed card list the way the remote API would: the
//! query is validated, matching cards are sorted with the query's sort spec
//! and sliced into fixed-size pages. Used for offline browsing and for
//! exercising the cache without a network.
//!
//! Matching rules:
//! - free text (or the wildcard) → case-insensitive substring of the name
//! - `c` any-of filter → card has every listed color
//! - `t` text filter → case-insensitive substring of the type line
//! - `cmc` / `usd` range filters → mana value / price within bounds
//! - any other filter is accepted and ignored

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use cardscroll_core::{Card, Error, FilterValue, RemotePage, Result, SearchQuery, WILDCARD_QUERY};
use parking_lot::Mutex;
use tracing::debug;

use crate::client::RemoteSearchClient;

/// Most recent fetches kept by [`InMemorySearchClient::requests`]
pub const REQUEST_LOG_CAPACITY: usize = 256;

/// One fetch as seen by the in-memory client
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRecord {
    /// Query that was fetched
    pub query: SearchQuery,
    /// Page that was requested
    pub page: u32,
}

#[derive(Default)]
struct MemoryState {
    fail_next: usize,
    latency: Duration,
    latency_by_text: HashMap<String, Duration>,
    fetches: usize,
    requests: VecDeque<FetchRecord>,
}

/// In-memory [`RemoteSearchClient`]
pub struct InMemorySearchClient {
    corpus: Vec<Card>,
    page_size: usize,
    state: Mutex<MemoryState>,
}

impl InMemorySearchClient {
    /// Create a client over `corpus` with fixed `page_size`
    pub fn new(corpus: Vec<Card>, page_size: usize) -> Self {
        InMemorySearchClient {
            corpus,
            page_size: page_size.max(1),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Corpus of `count` cards named `card-0000`, `card-0001`, ...
    pub fn numbered(count: usize, page_size: usize) -> Self {
        let corpus = (0..count)
            .map(|i| Card::new(format!("id-{:04}", i), format!("card-{:04}", i)))
            .collect();
        Self::new(corpus, page_size)
    }

    /// Delay every response by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    /// Delay responses for queries whose text equals `text`
    pub fn set_latency_for(&self, text: impl Into<String>, latency: Duration) {
        self.state.lock().latency_by_text.insert(text.into(), latency);
    }

    /// Fail the next `count` fetches with `Network`
    pub fn fail_next(&self, count: usize) {
        self.state.lock().fail_next = count;
    }

    /// Number of fetches served so far, failures included
    pub fn fetch_count(&self) -> usize {
        self.state.lock().fetches
    }

    /// The last [`REQUEST_LOG_CAPACITY`] fetches, in arrival order
    pub fn requests(&self) -> Vec<FetchRecord> {
        self.state.lock().requests.iter().cloned().collect()
    }

    fn matches(&self, card: &Card, query: &SearchQuery) -> bool {
        let text = query.text.trim();
        if !text.is_empty()
            && text != WILDCARD_QUERY
            && !card.name.to_lowercase().contains(&text.to_lowercase())
        {
            return false;
        }

        query.filters.iter().all(|(key, value)| match (key.as_str(), value) {
            ("c", FilterValue::AnyOf(colors)) => colors
                .iter()
                .all(|c| card.colors.iter().any(|have| have.eq_ignore_ascii_case(c))),
            ("t", FilterValue::Text(t)) => card
                .type_line
                .to_lowercase()
                .contains(&t.trim().to_lowercase()),
            ("cmc", FilterValue::Range { min, max }) => within(card.mana_value, *min, *max),
            ("usd", FilterValue::Range { min, max }) => within(card.price_usd, *min, *max),
            _ => true,
        })
    }
}

fn within(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    match value {
        Some(v) => min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m),
        None => false,
    }
}

#[async_trait]
impl RemoteSearchClient for InMemorySearchClient {
    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<RemotePage> {
        query.remote_query_text()?;

        let (latency, fail) = {
            let mut state = self.state.lock();
            state.fetches += 1;
            if state.requests.len() == REQUEST_LOG_CAPACITY {
                state.requests.pop_front();
            }
            state.requests.push_back(FetchRecord {
                query: query.clone(),
                page,
            });
            let latency = state
                .latency_by_text
                .get(query.text.trim())
                .copied()
                .unwrap_or(state.latency);
            let fail = state.fail_next > 0;
            if fail {
                state.fail_next -= 1;
            }
            (latency, fail)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if fail {
            return Err(Error::network("injected failure"));
        }
        if page == 0 {
            return Err(Error::invalid_query("page numbers start at 1"));
        }

        let mut hits: Vec<Card> = self
            .corpus
            .iter()
            .filter(|card| self.matches(card, query))
            .cloned()
            .collect();
        query.sort.sort_cards(&mut hits);

        let total = hits.len();
        let start = (page as usize - 1).saturating_mul(self.page_size).min(total);
        let end = (start + self.page_size).min(total);
        let cards = hits[start..end].to_vec();

        debug!(
            target: "cardscroll::remote",
            page,
            total,
            returned = cards.len(),
            "Served in-memory page"
        );

        Ok(RemotePage::new(cards, total, end < total, page))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardscroll_core::{Filters, SortCriteria, SortDirection, SortSpec};

    #[tokio::test]
    async fn test_pages_are_fixed_size_slices() {
        let client = InMemorySearchClient::numbered(400, 175);
        let query = SearchQuery::new("card", Filters::new());

        let p1 = client.fetch_page(&query, 1).await.unwrap();
        let p2 = client.fetch_page(&query, 2).await.unwrap();
        let p3 = client.fetch_page(&query, 3).await.unwrap();

        assert_eq!((p1.len(), p2.len(), p3.len()), (175, 175, 50));
        assert!(p1.has_more && p2.has_more && !p3.has_more);
        assert_eq!(p1.total_count, 400);
        assert_eq!(p2.cards[0].name, "card-0175");
        assert_eq!(client.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_wildcard_with_filters() {
        let corpus = vec![
            Card::new("1", "Elf").with_colors(["G"]).with_type_line("Creature - Elf"),
            Card::new("2", "Angel").with_colors(["W"]).with_type_line("Creature - Angel"),
            Card::new("3", "Ring").with_type_line("Artifact"),
        ];
        let client = InMemorySearchClient::new(corpus, 10);
        let query = SearchQuery::new("", Filters::new().with_text("t", "creature").with_any_of("c", ["g"]));

        let page = client.fetch_page(&query, 1).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.cards[0].name, "Elf");
    }

    #[tokio::test]
    async fn test_sort_applied_before_slicing() {
        let client = InMemorySearchClient::numbered(10, 4);
        let query = SearchQuery::new("card", Filters::new())
            .with_sort(SortSpec::new(SortCriteria::Name, SortDirection::Desc));
        let page = client.fetch_page(&query, 1).await.unwrap();
        assert_eq!(page.cards[0].name, "card-0009");
    }

    #[tokio::test]
    async fn test_injected_failures_and_empty_query() {
        let client = InMemorySearchClient::numbered(5, 5);
        client.fail_next(1);
        let query = SearchQuery::new("card", Filters::new());

        assert!(matches!(
            client.fetch_page(&query, 1).await,
            Err(Error::Network { .. })
        ));
        assert!(client.fetch_page(&query, 1).await.is_ok());

        let empty = SearchQuery::new("", Filters::new());
        assert!(matches!(
            client.fetch_page(&empty, 1).await,
            Err(Error::InvalidQuery { .. })
        ));
    }

    #[tokio::test]
    async fn test_request_log_keeps_only_recent_fetches() {
        let client = InMemorySearchClient::numbered(3, 1);
        let query = SearchQuery::new("card", Filters::new());
        for i in 0..REQUEST_LOG_CAPACITY + 10 {
            client.fetch_page(&query, (i % 3) as u32 + 1).await.unwrap();
        }

        assert_eq!(client.fetch_count(), REQUEST_LOG_CAPACITY + 10);
        let log = client.requests();
        assert_eq!(log.len(), REQUEST_LOG_CAPACITY);
        assert_eq!(log[0].page, (10 % 3) as u32 + 1);
    }

    #[tokio::test]
    async fn test_range_filter() {
        let corpus = vec![
            Card::new("1", "One").with_mana_value(1.0),
            Card::new("2", "Three").with_mana_value(3.0),
            Card::new("3", "Unknown"),
        ];
        let client = InMemorySearchClient::new(corpus, 10);
        let query = SearchQuery::new("*", Filters::new().with_range("cmc", Some(2.0), None));
        let page = client.fetch_page(&query, 1).await.unwrap();
        assert_eq!(page.cards.len(), 1);
        assert_eq!(page.cards[0].name, "Three");
    }
}
