//! Search cache
//!
//! `SearchCache` is the UI-facing surface: `search`, `load_more`,
//! `change_sort` and a read-only `subscribe` to the current pagination state
//! and result list. It owns:
//!
//! - a [`SearchRequestCoordinator`] arbitrating overlapping searches
//! - a [`PageConsumptionTracker`] slicing remote pages into display batches
//! - a subscription to the [`SortCoordinator`] for its area
//!
//! ## Commit protocol
//!
//! Fetched results are applied under the state lock, in the same critical
//! section as the final `commit` check, so no stale response can interleave
//! with a newer one. Failed fetches record the error in the snapshot and
//! leave the pagination state and card list untouched.
//!
//! "Load more" fetches are not arbitrated by tokens; they carry the
//! generation (token id) of the search they extend and are dropped if a
//! newer search committed while they were in flight.

use std::sync::Arc;

use cardscroll_concurrency::{RequestPhase, RequestToken, SearchRequestCoordinator};
use cardscroll_core::{
    Card, Error, Filters, Limits, PaginationState, RemotePage, Result, SearchQuery, SortCriteria,
    SortDirection, SortSpec,
};
use cardscroll_remote::RemoteSearchClient;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::pagination::{BatchFill, PageConsumptionTracker};
use crate::sort::{SortChangeEvent, SortCoordinator, SubscriptionGuard};

/// Read-only view published to subscribers after every state change
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    /// Pagination progress of the committed search
    pub pagination: PaginationState,
    /// Cards handed out so far, in display order
    pub cards: Arc<Vec<Card>>,
    /// Last user-visible error, cleared by the next successful commit
    pub error: Option<Error>,
}

/// Outcome of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Results were fetched and committed
    Committed {
        /// Cards in the first batch
        loaded: usize,
        /// Cards matching the query
        total: usize,
    },
    /// Query equals the committed one; nothing was fetched
    Cached {
        /// Cards already loaded
        loaded: usize,
        /// Cards matching the query
        total: usize,
    },
    /// A newer search won arbitration; results were dropped
    Discarded {
        /// Id of the losing request
        token: u64,
    },
}

/// Outcome of a "load more"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadMore {
    /// A batch was appended
    Loaded {
        /// Cards appended by this call
        batch: usize,
        /// Cards loaded in total
        loaded: usize,
        /// Whether another "load more" can produce anything
        has_more: bool,
    },
    /// A "load more" fetch is already outstanding
    Busy,
    /// A newer search committed while the page was in flight
    Discarded,
}

/// Outcome of a sort change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SortOutcome {
    /// Nothing broadcast: same sort, or stored for the next search
    NoChange,
    /// Loaded cards were reordered in memory
    Reordered {
        /// Cards reordered
        loaded: usize,
    },
    /// A priority search was run with the new order
    Requeried {
        /// How the priority search ended
        search: SearchOutcome,
    },
}

struct CacheState {
    pagination: PaginationState,
    cards: Arc<Vec<Card>>,
    tracker: PageConsumptionTracker,
    committed: bool,
    error: Option<Error>,
}

impl CacheState {
    fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            pagination: self.pagination.clone(),
            cards: Arc::clone(&self.cards),
            error: self.error.clone(),
        }
    }

    fn append(&mut self, batch: Vec<Card>) {
        self.pagination.loaded_cards += batch.len();
        Arc::make_mut(&mut self.cards).extend(batch);
        self.sync_tracker();
    }

    fn sync_tracker(&mut self) {
        self.pagination.current_remote_page = self.tracker.current_page_number();
        self.pagination.consumed_from_current_page = self.tracker.consumed();
        self.pagination.has_more = self.tracker.has_more();
    }
}

/// Paginated search cache for one sort area
pub struct SearchCache<C> {
    area: String,
    limits: Limits,
    batch_fill: BatchFill,
    client: C,
    requests: SearchRequestCoordinator,
    sorts: Arc<SortCoordinator>,
    state: Mutex<CacheState>,
    events: Mutex<mpsc::UnboundedReceiver<SortChangeEvent>>,
    snapshots: watch::Sender<CacheSnapshot>,
    _subscription: SubscriptionGuard,
}

impl<C: RemoteSearchClient> SearchCache<C> {
    /// Cache with its own sort coordinator
    pub fn new(client: C, config: &CacheConfig) -> Result<Self> {
        let sorts = Arc::new(SortCoordinator::new(config.server_sort));
        Self::with_sort_coordinator(client, sorts, config)
    }

    /// Cache sharing `sorts` with other components
    ///
    /// The shared coordinator's policy decides server sorts; the config's
    /// `server_sort` is ignored.
    pub fn with_sort_coordinator(
        client: C,
        sorts: Arc<SortCoordinator>,
        config: &CacheConfig,
    ) -> Result<Self> {
        config.validate()?;
        let limits = config.limits();
        let area = config.area.clone();

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = sorts.subscribe_guarded(area.clone(), move |event: &SortChangeEvent| {
            tx.send(event.clone()).ok();
        });

        let query = SearchQuery {
            sort: sorts.sort_for(&area),
            ..SearchQuery::default()
        };
        let state = CacheState {
            pagination: PaginationState::new(query, &limits, 0),
            cards: Arc::new(Vec::new()),
            tracker: PageConsumptionTracker::new(limits.display_batch_size),
            committed: false,
            error: None,
        };
        let (snapshots, _) = watch::channel(state.snapshot());

        info!(
            target: "cardscroll::cache",
            area = %area,
            client = client.name(),
            remote_page_size = limits.remote_page_size,
            display_batch_size = limits.display_batch_size,
            "Search cache ready"
        );

        Ok(SearchCache {
            area,
            limits,
            batch_fill: config.batch_fill,
            client,
            requests: SearchRequestCoordinator::new(&limits),
            sorts,
            state: Mutex::new(state),
            events: Mutex::new(rx),
            snapshots,
            _subscription: subscription,
        })
    }

    /// Search for `text` narrowed by `filters`, in the area's current sort
    ///
    /// # Errors
    ///
    /// `InvalidQuery` when there is neither text nor a filter, `Network` or
    /// `InvalidQuery` from the remote API. In every error case the previous
    /// results stay in place and the error is published in the snapshot.
    pub async fn search(&self, text: impl Into<String>, filters: Filters) -> Result<SearchOutcome> {
        let mut query = SearchQuery::new(text, filters);
        query.sort = self.sorts.sort_for(&self.area);
        self.run_search(query, false).await
    }

    async fn run_search(&self, query: SearchQuery, priority: bool) -> Result<SearchOutcome> {
        {
            let state = self.state.lock();
            if state.committed
                && state.pagination.last_query == query
                && self.requests.in_flight() == 0
            {
                debug!(target: "cardscroll::cache", query = %query.text, "Served from cache");
                return Ok(SearchOutcome::Cached {
                    loaded: state.pagination.loaded_cards,
                    total: state.pagination.total_cards,
                });
            }
        }

        if let Err(error) = query.remote_query_text() {
            self.publish_error(error.clone());
            return Err(error);
        }

        let guard = self.requests.guard(self.requests.start_search(&query, priority));
        let token = *guard.token();
        self.requests.pace(&token).await;
        if self.requests.check(&token).is_err() {
            debug!(
                target: "cardscroll::cache",
                token = token.id(),
                "Superseded before fetch"
            );
            return Ok(SearchOutcome::Discarded { token: token.id() });
        }

        let fetched = self.client.fetch_page(&query, 1).await;
        self.apply_search(&token, query, fetched)
    }

    fn apply_search(
        &self,
        token: &RequestToken,
        query: SearchQuery,
        fetched: Result<RemotePage>,
    ) -> Result<SearchOutcome> {
        let mut state = self.state.lock();

        let page = match fetched {
            Ok(page) => page,
            Err(error) => {
                let visible = self.requests.may_commit(token);
                self.requests.cancel(token);
                if !visible {
                    debug!(
                        target: "cardscroll::cache",
                        token = token.id(),
                        %error,
                        "Failure of a superseded search ignored"
                    );
                    return Ok(SearchOutcome::Discarded { token: token.id() });
                }
                warn!(target: "cardscroll::cache", token = token.id(), %error, "Search failed");
                state.error = Some(error.clone());
                self.publish(&state);
                return Err(error);
            }
        };

        if let Err(stale) = self.requests.commit(token) {
            debug!(target: "cardscroll::cache", %stale, "Result dropped");
            return Ok(SearchOutcome::Discarded { token: token.id() });
        }

        let total = page.total_count;
        let batch = state.tracker.initialize(page);
        let mut pagination = PaginationState::new(query, &self.limits, token.id());
        pagination.total_cards = total;
        pagination.loaded_cards = batch.len();
        state.pagination = pagination;
        state.cards = Arc::new(batch);
        state.sync_tracker();
        state.committed = true;
        state.error = None;

        self.sorts.record_results(&self.area, &state.pagination);
        self.publish(&state);

        let loaded = state.pagination.loaded_cards;
        info!(
            target: "cardscroll::cache",
            token = token.id(),
            priority = token.is_priority(),
            loaded,
            total,
            "Search committed"
        );
        Ok(SearchOutcome::Committed { loaded, total })
    }

    /// Hand out the next display batch of the committed search
    ///
    /// Fetches the next remote page when the current one is used up. With
    /// [`BatchFill::TopUp`], a batch that runs off the end of a page is
    /// filled from the next page in the same call.
    ///
    /// # Errors
    ///
    /// - `NoActiveSearch` before the first committed search
    /// - `Exhausted` once everything was handed out; `has_more` is cleared
    /// - `Network` / `InvalidQuery` when the page fetch fails; cards already
    ///   handed out stay in place and the call can be retried
    pub async fn load_more(&self) -> Result<LoadMore> {
        let batch_size = self.limits.display_batch_size;

        let (generation, query, page_number, served) = {
            let mut state = self.state.lock();
            if !state.committed {
                return Err(Error::NoActiveSearch);
            }
            if state.pagination.is_loading_more {
                return Ok(LoadMore::Busy);
            }

            let consumption = state.tracker.consume_next(batch_size);
            let served = consumption.batch.len();
            if served > 0 {
                state.append(consumption.batch);
            }

            let top_up =
                self.batch_fill == BatchFill::TopUp && served < batch_size && state.tracker.has_more();
            if !consumption.needs_new_remote_page && !top_up {
                self.record_and_publish(&state);
                return Ok(LoadMore::Loaded {
                    batch: served,
                    loaded: state.pagination.loaded_cards,
                    has_more: state.pagination.has_more,
                });
            }

            let page_number = match state.tracker.next_page_number() {
                Ok(number) => number,
                Err(error) => {
                    state.pagination.has_more = false;
                    self.publish(&state);
                    info!(
                        target: "cardscroll::pagination",
                        loaded = state.pagination.loaded_cards,
                        "Result set exhausted"
                    );
                    return Err(error);
                }
            };

            state.pagination.is_loading_more = true;
            self.publish(&state);
            (
                state.pagination.generation,
                state.pagination.last_query.clone(),
                page_number,
                served,
            )
        };

        debug!(
            target: "cardscroll::pagination",
            page = page_number,
            generation,
            "Fetching next remote page"
        );
        let loading = LoadingMore {
            cache: self,
            generation,
        };
        let fetched = self.client.fetch_page(&query, page_number).await;
        drop(loading);

        let mut state = self.state.lock();
        if state.pagination.generation != generation {
            debug!(
                target: "cardscroll::pagination",
                page = page_number,
                generation,
                "Page arrived after a newer search; dropped"
            );
            return Ok(LoadMore::Discarded);
        }

        let page = match fetched {
            Ok(page) => page,
            Err(error) => {
                warn!(target: "cardscroll::pagination", page = page_number, %error, "Page fetch failed");
                state.error = Some(error.clone());
                self.publish(&state);
                return Err(error);
            }
        };

        state.pagination.total_cards = page.total_count;
        let batch = state.tracker.initialize_partial(page, batch_size - served);
        let fetched_count = batch.len();
        state.append(batch);
        state.error = None;
        self.record_and_publish(&state);

        Ok(LoadMore::Loaded {
            batch: served + fetched_count,
            loaded: state.pagination.loaded_cards,
            has_more: state.pagination.has_more,
        })
    }

    /// Change the sort of `area` and satisfy it
    ///
    /// Large result sets are re-queried as a priority search with the
    /// committed query in the new order; small ones are reordered in memory.
    /// Changes to other areas are broadcast to their subscribers only.
    pub async fn change_sort(
        &self,
        area: &str,
        criteria: SortCriteria,
        direction: SortDirection,
    ) -> Result<SortOutcome> {
        let sort = SortSpec::new(criteria, direction);
        let changed = self.sorts.set_sort(area, criteria, direction).is_some();
        if !changed && self.displays_other_sort(area, sort) {
            // Stored already, but the last attempt to apply it never committed.
            self.sorts.resend_sort(area);
        }
        self.pump_sort_events().await
    }

    fn displays_other_sort(&self, area: &str, sort: SortSpec) -> bool {
        if area != self.area {
            return false;
        }
        let state = self.state.lock();
        state.committed && state.pagination.last_query.sort != sort
    }

    /// Act on sort changes received for this cache's area
    ///
    /// Only the newest pending event is acted on; older ones describe a sort
    /// state that no longer exists.
    pub async fn pump_sort_events(&self) -> Result<SortOutcome> {
        let latest = {
            let mut events = self.events.lock();
            let mut latest = None;
            while let Ok(event) = events.try_recv() {
                latest = Some(event);
            }
            latest
        };

        match latest {
            Some(event) => self.apply_sort_event(event).await,
            None => Ok(SortOutcome::NoChange),
        }
    }

    async fn apply_sort_event(&self, event: SortChangeEvent) -> Result<SortOutcome> {
        if event.requires_server_search {
            let query = {
                let state = self.state.lock();
                if !state.committed {
                    return Ok(SortOutcome::NoChange);
                }
                state.pagination.last_query.with_sort(event.sort)
            };
            let outcome = self.run_search(query, true).await?;
            return Ok(SortOutcome::Requeried { search: outcome });
        }

        let mut state = self.state.lock();
        if !state.committed {
            return Ok(SortOutcome::NoChange);
        }
        event.sort.sort_cards(Arc::make_mut(&mut state.cards).as_mut_slice());
        state.pagination.last_query = state.pagination.last_query.with_sort(event.sort);
        self.publish(&state);

        debug!(
            target: "cardscroll::cache",
            sort = %event.sort,
            loaded = state.cards.len(),
            "Reordered in memory"
        );
        Ok(SortOutcome::Reordered {
            loaded: state.cards.len(),
        })
    }

    /// Watch every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<CacheSnapshot> {
        self.snapshots.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> CacheSnapshot {
        self.state.lock().snapshot()
    }

    /// Current pagination state
    pub fn pagination(&self) -> PaginationState {
        self.state.lock().pagination.clone()
    }

    /// Cards handed out so far
    pub fn cards(&self) -> Arc<Vec<Card>> {
        Arc::clone(&self.state.lock().cards)
    }

    /// Last user-visible error
    pub fn error(&self) -> Option<Error> {
        self.state.lock().error.clone()
    }

    /// Dismiss the visible error
    pub fn clear_error(&self) {
        let mut state = self.state.lock();
        if state.error.take().is_some() {
            self.publish(&state);
        }
    }

    /// Sort the next search of this area will use
    pub fn sort(&self) -> SortSpec {
        self.sorts.sort_for(&self.area)
    }

    /// Phase of the search surface
    pub fn phase(&self) -> RequestPhase {
        self.requests.surface_phase()
    }

    /// Area owned by the cache
    pub fn area(&self) -> &str {
        &self.area
    }

    /// Sizes and timings in effect
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Underlying remote client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Sort coordinator the cache is subscribed to
    pub fn sort_coordinator(&self) -> &Arc<SortCoordinator> {
        &self.sorts
    }

    /// Request coordinator arbitrating this cache's searches
    pub fn request_coordinator(&self) -> &SearchRequestCoordinator {
        &self.requests
    }

    fn record_and_publish(&self, state: &CacheState) {
        self.sorts.record_results(&self.area, &state.pagination);
        self.publish(state);
    }

    fn publish(&self, state: &CacheState) {
        self.snapshots.send_replace(state.snapshot());
    }

    fn publish_error(&self, error: Error) {
        let mut state = self.state.lock();
        state.error = Some(error);
        self.publish(&state);
    }
}

/// Clears `is_loading_more` when a "load more" fetch ends, dropped or not
struct LoadingMore<'a, C: RemoteSearchClient> {
    cache: &'a SearchCache<C>,
    generation: u64,
}

impl<C: RemoteSearchClient> Drop for LoadingMore<'_, C> {
    fn drop(&mut self) {
        let mut state = self.cache.state.lock();
        if state.pagination.generation == self.generation && state.pagination.is_loading_more {
            state.pagination.is_loading_more = false;
            self.cache.publish(&state);
        }
    }
}
