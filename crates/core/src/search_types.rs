//! Core search types for the paginated card browser
//!
//! This module defines the values that flow between the UI, the cache and the
//! remote search API:
//! - SearchQuery: free text, filters and sort; equality decides cache reuse
//! - Filters / FilterValue: ordered filter map encoded into the remote query
//! - RemotePage: one fixed-size page as fetched from the API
//! - PaginationState: the cache's public snapshot of pagination progress

use crate::error::{Error, Result};
use crate::limits::{Limits, WILDCARD_QUERY};
use crate::sort::SortSpec;
use crate::types::Card;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Filters
// ============================================================================

/// Value of one filter entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    /// Single text value (format, type, set...)
    Text(String),
    /// Match every member (colors)
    AnyOf(BTreeSet<String>),
    /// Inclusive numeric range; either bound may be open
    Range {
        /// Lower bound
        min: Option<f64>,
        /// Upper bound
        max: Option<f64>,
    },
}

impl FilterValue {
    fn clauses(&self, key: &str) -> Vec<String> {
        match self {
            FilterValue::Text(value) => {
                let value = value.trim();
                if value.is_empty() {
                    vec![]
                } else if value.contains(char::is_whitespace) {
                    vec![format!("{}:\"{}\"", key, value)]
                } else {
                    vec![format!("{}:{}", key, value)]
                }
            }
            FilterValue::AnyOf(values) => values
                .iter()
                .filter(|v| !v.trim().is_empty())
                .map(|v| format!("{}:{}", key, v.trim()))
                .collect(),
            FilterValue::Range { min, max } => {
                let mut out = Vec::new();
                if let Some(min) = min {
                    out.push(format!("{}>={}", key, min));
                }
                if let Some(max) = max {
                    out.push(format!("{}<={}", key, max));
                }
                out
            }
        }
    }
}

/// Ordered filter set
///
/// Backed by a `BTreeMap` so two filter sets with the same entries compare
/// equal and encode to the same query string regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, FilterValue>);

impl Filters {
    /// Empty filter set
    pub fn new() -> Self {
        Filters(BTreeMap::new())
    }

    /// Builder: text filter
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), FilterValue::Text(value.into()));
        self
    }

    /// Builder: any-of filter
    pub fn with_any_of<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = values.into_iter().map(Into::into).collect();
        self.0.insert(key.into(), FilterValue::AnyOf(set));
        self
    }

    /// Builder: numeric range filter
    pub fn with_range(mut self, key: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        self.0.insert(key.into(), FilterValue::Range { min, max });
        self
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, key: impl Into<String>, value: FilterValue) {
        self.0.insert(key.into(), value);
    }

    /// Remove an entry
    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        self.0.remove(key)
    }

    /// Look up an entry
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.0.iter()
    }

    /// Number of entries, including ones that encode to nothing
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remote query clauses, in key order
    ///
    /// Blank text values, empty sets and unbounded ranges produce no clause.
    pub fn clauses(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(key, value)| value.clauses(key))
            .collect()
    }
}

// ============================================================================
// SearchQuery
// ============================================================================

/// Immutable description of one search
///
/// Two queries are equal iff text, filters and sort are all equal. An equal
/// query can be served from the cache; a query that differs only in sort may
/// still be reorderable locally (see the sort coordinator).
///
/// # Examples
///
/// ```
/// use cardscroll_core::{Filters, SearchQuery, SortCriteria, SortDirection, SortSpec};
///
/// let q = SearchQuery::new("", Filters::new().with_text("f", "modern"));
/// assert_eq!(q.remote_query_text().unwrap(), "* f:modern");
///
/// let by_price = q.with_sort(SortSpec::new(SortCriteria::Price, SortDirection::Desc));
/// assert!(by_price.same_selection(&q));
/// assert_ne!(by_price, q);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free text typed by the user
    pub text: String,

    /// Structured filters
    pub filters: Filters,

    /// Requested ordering
    pub sort: SortSpec,
}

impl SearchQuery {
    /// Create a query with the default sort
    pub fn new(text: impl Into<String>, filters: Filters) -> Self {
        SearchQuery {
            text: text.into(),
            filters,
            sort: SortSpec::default(),
        }
    }

    /// Builder: replace the sort
    pub fn with_sort(&self, sort: SortSpec) -> Self {
        SearchQuery {
            text: self.text.clone(),
            filters: self.filters.clone(),
            sort,
        }
    }

    /// Whether both queries select the same cards (sort ignored)
    pub fn same_selection(&self, other: &SearchQuery) -> bool {
        self.text.trim() == other.text.trim() && self.filters == other.filters
    }

    /// Encode text and filters into the single `query` string the API takes
    ///
    /// Empty text with filters becomes the wildcard token followed by the
    /// filter clauses. Empty text without any effective filter is rejected
    /// with `InvalidQuery` and must never be sent.
    pub fn remote_query_text(&self) -> Result<String> {
        let text = self.text.trim();
        let clauses = self.filters.clauses();

        if text.is_empty() && clauses.is_empty() {
            return Err(Error::invalid_query("query has neither text nor filters"));
        }

        let mut parts = Vec::with_capacity(clauses.len() + 1);
        parts.push(if text.is_empty() {
            WILDCARD_QUERY.to_string()
        } else {
            text.to_string()
        });
        parts.extend(clauses);
        Ok(parts.join(" "))
    }
}

// ============================================================================
// RemotePage
// ============================================================================

/// One page of results from the remote API
///
/// Owned by the page tracker that requested it and never changed after it
/// is received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePage {
    /// Cards in remote order
    pub cards: Vec<Card>,

    /// Total cards matching the query across all pages
    pub total_count: usize,

    /// Whether a page after this one exists
    pub has_more: bool,

    /// 1-based page number
    pub page_number: u32,
}

impl RemotePage {
    /// Create a page
    pub fn new(cards: Vec<Card>, total_count: usize, has_more: bool, page_number: u32) -> Self {
        RemotePage {
            cards,
            total_count,
            has_more,
            page_number,
        }
    }

    /// Number of cards on this page
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the page carries no cards
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

// ============================================================================
// PaginationState
// ============================================================================

/// The cache's public snapshot of pagination progress
///
/// # Invariants
///
/// - `loaded_cards` equals the sum of all batch sizes handed to the UI
/// - `consumed_from_current_page` never exceeds the current page's length
///
/// A fresh state is created for every new query and replaced wholesale when
/// the query changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationState {
    /// Cards matching the query across all pages
    pub total_cards: usize,

    /// Cards handed to the UI so far
    pub loaded_cards: usize,

    /// Whether "load more" can produce anything
    pub has_more: bool,

    /// Whether a "load more" fetch is outstanding
    pub is_loading_more: bool,

    /// Remote page size of this deployment
    pub remote_page_size: usize,

    /// Display batch size of this deployment
    pub display_batch_size: usize,

    /// Page number of the page being consumed
    pub current_remote_page: u32,

    /// Cards of the current page already handed out
    pub consumed_from_current_page: usize,

    /// Query that produced this state
    pub last_query: SearchQuery,

    /// Id of the request token that created this state
    pub generation: u64,
}

impl PaginationState {
    /// Fresh state for a query, before any page is consumed
    pub fn new(query: SearchQuery, limits: &Limits, generation: u64) -> Self {
        PaginationState {
            total_cards: 0,
            loaded_cards: 0,
            has_more: false,
            is_loading_more: false,
            remote_page_size: limits.remote_page_size,
            display_batch_size: limits.display_batch_size,
            current_remote_page: 0,
            consumed_from_current_page: 0,
            last_query: query,
            generation,
        }
    }

    /// Whether every matching card has been handed out
    pub fn fully_loaded(&self) -> bool {
        self.loaded_cards >= self.total_cards
    }
}
