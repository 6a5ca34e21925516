//! Search request coordinator
//!
//! Arbitrates which of several overlapping searches may commit its results.
//! Ordering comes entirely from token comparison, never from the order in
//! which responses happen to arrive.
//!
//! ## Request Sequence
//!
//! ```text
//! 1. start_search()    - mint token; maybe becomes current / priority token
//! 2. pace()            - ordinary searches wait for their spacing slot
//! 3. check()           - superseded while waiting? skip the fetch
//! 4. <remote fetch>    - the only suspension point
//! 5. commit()          - mayCommit again; Committed or StaleResultDiscarded
//! 6. complete_search() - schedule release of a matching priority token
//! ```
//!
//! ## Priority Window
//!
//! A priority (sort-triggered) search holds the priority token for
//! `priority_window`. During that window an ordinary search for a different
//! selection does not become the current token, so it cannot pre-empt the
//! sort. An ordinary search for the same selection still does. Once the
//! window elapses, or `priority_release` after the priority search completes,
//! the hold lapses and ordinary searches supersede it again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cardscroll_core::{Error, Limits, Result, SearchQuery};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::token::{RequestPhase, RequestToken};

/// Priority token plus the selection it was issued for
#[derive(Debug, Clone)]
struct PriorityHold {
    token: RequestToken,
    query: SearchQuery,
    expires_at: Instant,
    release_at: Option<Instant>,
}

impl PriorityHold {
    fn is_active(&self, now: Instant) -> bool {
        now < self.expires_at && self.release_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Default)]
struct CoordinatorState {
    current: Option<RequestToken>,
    priority: Option<PriorityHold>,
    phases: HashMap<u64, RequestPhase>,
    last_finished: Option<(u64, RequestPhase)>,
    next_slot: Option<Instant>,
}

impl CoordinatorState {
    fn active_priority(&self, now: Instant) -> Option<&PriorityHold> {
        self.priority.as_ref().filter(|hold| hold.is_active(now))
    }

    fn may_commit(&self, token: &RequestToken, now: Instant) -> bool {
        let is_current = self.current.map_or(false, |t| t.id() == token.id());
        let is_priority = self
            .active_priority(now)
            .map_or(false, |hold| hold.token.id() == token.id());
        is_current || is_priority
    }

    fn finish(&mut self, token: &RequestToken, phase: RequestPhase) {
        self.phases.insert(token.id(), phase);
    }
}

/// Owner of all search arbitration state for one search surface
///
/// Token ids are allocated from a monotonic counter starting at 1. All other
/// bookkeeping sits behind one lock that is never held across an await.
pub struct SearchRequestCoordinator {
    next_id: AtomicU64,
    search_spacing: Duration,
    priority_window: Duration,
    priority_release: Duration,
    state: Mutex<CoordinatorState>,
}

impl SearchRequestCoordinator {
    /// Create a coordinator with the timings of `limits`
    pub fn new(limits: &Limits) -> Self {
        SearchRequestCoordinator {
            next_id: AtomicU64::new(1),
            search_spacing: limits.search_spacing,
            priority_window: limits.priority_window,
            priority_release: limits.priority_release,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Start a search and mint its token
    ///
    /// # Arguments
    /// * `query` - The query being searched; used to relate ordinary searches
    ///   to an active priority search.
    /// * `priority` - Whether the search was triggered by a sort change.
    ///
    /// A priority token always becomes both the current token and the
    /// priority token, replacing any earlier priority hold. An ordinary token
    /// becomes current unless an active priority hold exists for a different
    /// selection.
    pub fn start_search(&self, query: &SearchQuery, priority: bool) -> RequestToken {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Instant::now();
        let token = RequestToken::new(id, priority, now);

        let mut state = self.state.lock();
        state.phases.insert(id, RequestPhase::Fetching);

        if priority {
            state.current = Some(token);
            state.priority = Some(PriorityHold {
                token,
                query: query.clone(),
                expires_at: now + self.priority_window,
                release_at: None,
            });
            info!(target: "cardscroll::request", token = id, "Priority search started");
            return token;
        }

        let blocked_by = state
            .active_priority(now)
            .filter(|hold| !hold.query.same_selection(query))
            .map(|hold| hold.token.id());

        match blocked_by {
            Some(holder) => {
                debug!(
                    target: "cardscroll::request",
                    token = id,
                    holder,
                    "Search started under an active priority hold; not current"
                );
            }
            None => {
                if state
                    .priority
                    .as_ref()
                    .map_or(false, |hold| !hold.is_active(now))
                {
                    state.priority = None;
                }
                state.current = Some(token);
                debug!(target: "cardscroll::request", token = id, "Search started");
            }
        }

        token
    }

    /// Whether `token` is still allowed to mutate the cache
    ///
    /// True iff the token is the current token or the active priority token.
    /// Must be checked before applying fetched results, after the fetch
    /// completes.
    pub fn may_commit(&self, token: &RequestToken) -> bool {
        self.state.lock().may_commit(token, Instant::now())
    }

    /// Pre-fetch check; cancels the request if it already lost arbitration
    pub fn check(&self, token: &RequestToken) -> Result<()> {
        let mut state = self.state.lock();
        if state.may_commit(token, Instant::now()) {
            Ok(())
        } else {
            state.finish(token, RequestPhase::Cancelled);
            Err(Error::StaleResultDiscarded { token: token.id() })
        }
    }

    /// Final arbitration right before results are applied
    ///
    /// Transitions the request to `Committed` when it may commit, otherwise
    /// to `Cancelled` with `StaleResultDiscarded`. The caller must not touch
    /// shared state on error.
    pub fn commit(&self, token: &RequestToken) -> Result<()> {
        let mut state = self.state.lock();
        if state.may_commit(token, Instant::now()) {
            state.finish(token, RequestPhase::Committed);
            Ok(())
        } else {
            state.finish(token, RequestPhase::Cancelled);
            debug!(target: "cardscroll::request", token = token.id(), "Stale result discarded");
            Err(Error::StaleResultDiscarded { token: token.id() })
        }
    }

    /// Mark a request cancelled without committing (fetch failed, etc.)
    pub fn cancel(&self, token: &RequestToken) {
        self.state.lock().finish(token, RequestPhase::Cancelled);
    }

    /// Finish a request's bookkeeping
    ///
    /// If `token` holds the priority token, the hold is released after
    /// `priority_release` rather than immediately, so a rapid follow-up
    /// search cannot pre-empt it before its commit has visibly landed.
    pub fn complete_search(&self, token: &RequestToken) {
        let now = Instant::now();
        let mut state = self.state.lock();

        let phase = match state.phases.remove(&token.id()) {
            Some(RequestPhase::Fetching) | None => RequestPhase::Cancelled,
            Some(phase) => phase,
        };
        state.last_finished = Some((token.id(), phase));

        let release_delay = self.priority_release;
        if let Some(hold) = state.priority.as_mut() {
            if hold.token.id() == token.id() && hold.release_at.is_none() {
                hold.release_at = Some(now + release_delay);
                debug!(
                    target: "cardscroll::request",
                    token = token.id(),
                    release_ms = release_delay.as_millis() as u64,
                    "Priority hold released after delay"
                );
            }
        }
    }

    /// Wait for an ordinary search's spacing slot
    ///
    /// Priority searches return immediately. Ordinary searches are spaced at
    /// least `search_spacing` apart; the first one in a quiet period goes out
    /// immediately.
    pub async fn pace(&self, token: &RequestToken) {
        if token.is_priority() {
            return;
        }

        let slot = {
            let mut state = self.state.lock();
            let now = Instant::now();
            let slot = match state.next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            state.next_slot = Some(slot + self.search_spacing);
            slot
        };

        if slot > Instant::now() {
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Phase of one request
    ///
    /// Completed requests other than the most recent one report `Idle`.
    pub fn phase(&self, token: &RequestToken) -> RequestPhase {
        let state = self.state.lock();
        if let Some(phase) = state.phases.get(&token.id()) {
            return *phase;
        }
        match state.last_finished {
            Some((id, phase)) if id == token.id() => phase,
            _ => RequestPhase::Idle,
        }
    }

    /// Phase of the search surface as a whole
    ///
    /// `Fetching` while any request is unresolved, otherwise the outcome of
    /// the most recently completed request.
    pub fn surface_phase(&self) -> RequestPhase {
        let state = self.state.lock();
        if state.phases.values().any(|p| *p == RequestPhase::Fetching) {
            return RequestPhase::Fetching;
        }
        state
            .last_finished
            .map(|(_, phase)| phase)
            .unwrap_or(RequestPhase::Idle)
    }

    /// Current token, if any
    pub fn current_token(&self) -> Option<RequestToken> {
        self.state.lock().current
    }

    /// Active priority token, if any
    pub fn priority_token(&self) -> Option<RequestToken> {
        self.state
            .lock()
            .active_priority(Instant::now())
            .map(|hold| hold.token)
    }

    /// Number of requests started and not yet completed
    pub fn in_flight(&self) -> usize {
        self.state
            .lock()
            .phases
            .values()
            .filter(|p| **p == RequestPhase::Fetching)
            .count()
    }

    /// Tie `token`'s completion to the returned guard
    ///
    /// A search whose future is dropped mid-fetch still completes: its phase
    /// leaves `Fetching` and any priority hold is scheduled for release.
    pub fn guard(&self, token: RequestToken) -> SearchGuard<'_> {
        SearchGuard {
            coordinator: self,
            token,
        }
    }
}

/// Calls [`SearchRequestCoordinator::complete_search`] when dropped
#[must_use = "dropping the guard completes the search immediately"]
pub struct SearchGuard<'a> {
    coordinator: &'a SearchRequestCoordinator,
    token: RequestToken,
}

impl SearchGuard<'_> {
    /// Token of the guarded search
    pub fn token(&self) -> &RequestToken {
        &self.token
    }
}

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.complete_search(&self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardscroll_core::{Filters, SortCriteria, SortDirection, SortSpec};

    fn coordinator() -> SearchRequestCoordinator {
        SearchRequestCoordinator::new(&Limits::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_guard_cancels_unfinished_search() {
        let coord = coordinator();
        let query = SearchQuery::new("elf", Filters::new());

        let guard = coord.guard(coord.start_search(&query, false));
        let token = *guard.token();
        assert_eq!(coord.in_flight(), 1);
        assert_eq!(coord.surface_phase(), RequestPhase::Fetching);

        drop(guard);
        assert_eq!(coord.in_flight(), 0);
        assert_eq!(coord.phase(&token), RequestPhase::Cancelled);
        assert_eq!(coord.surface_phase(), RequestPhase::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_keeps_committed_phase() {
        let coord = coordinator();
        let query = SearchQuery::new("elf", Filters::new());

        let guard = coord.guard(coord.start_search(&query, true));
        coord.commit(guard.token()).unwrap();
        let token = *guard.token();
        drop(guard);
        assert_eq!(coord.phase(&token), RequestPhase::Committed);
        assert!(coord.priority_token().is_some());

        tokio::time::advance(Limits::default().priority_release).await;
        assert!(coord.priority_token().is_none());
    }

    fn query(text: &str) -> SearchQuery {
        SearchQuery::new(text, Filters::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_ids_are_monotonic() {
        let coord = coordinator();
        let a = coord.start_search(&query("a"), false);
        let b = coord.start_search(&query("b"), true);
        let c = coord.start_search(&query("c"), false);
        assert!(a.id() < b.id() && b.id() < c.id());
        assert!(b.is_priority());
        assert!(!a.is_priority());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_ordinary_search_supersedes_older() {
        let coord = coordinator();
        let a = coord.start_search(&query("a"), false);
        let b = coord.start_search(&query("ab"), false);

        assert!(!coord.may_commit(&a));
        assert!(coord.may_commit(&b));
        assert!(matches!(
            coord.commit(&a),
            Err(Error::StaleResultDiscarded { .. })
        ));
        assert_eq!(coord.phase(&a), RequestPhase::Cancelled);
        assert!(coord.commit(&b).is_ok());
        assert_eq!(coord.phase(&b), RequestPhase::Committed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_search_beats_earlier_ordinary_search() {
        let coord = coordinator();
        let a = coord.start_search(&query("elf"), false);
        let sorted = query("elf").with_sort(SortSpec::new(SortCriteria::Price, SortDirection::Desc));
        let b = coord.start_search(&sorted, true);

        // B resolves first and commits; A's late answer must be dropped.
        assert!(coord.commit(&b).is_ok());
        coord.complete_search(&b);
        assert!(!coord.may_commit(&a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ordinary_search_commits_when_finished_before_priority_starts() {
        let coord = coordinator();
        let a = coord.start_search(&query("elf"), false);
        assert!(coord.commit(&a).is_ok());
        coord.complete_search(&a);

        let b = coord.start_search(&query("elf"), true);
        assert!(coord.may_commit(&b));
        assert_eq!(coord.phase(&a), RequestPhase::Committed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_search_cannot_preempt_priority_window() {
        let coord = coordinator();
        let sort = coord.start_search(&query("elf"), true);
        tokio::time::advance(Duration::from_millis(500)).await;

        let typing = coord.start_search(&query("goblin"), false);
        assert!(coord.may_commit(&sort));
        assert!(!coord.may_commit(&typing));
        assert_eq!(coord.current_token().map(|t| t.id()), Some(sort.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_related_search_becomes_current_during_window() {
        let coord = coordinator();
        let sort = coord.start_search(&query("elf"), true);
        let same = coord.start_search(&query("elf"), false);

        assert!(coord.may_commit(&sort));
        assert!(coord.may_commit(&same));
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_supersedes_priority_after_window() {
        let coord = coordinator();
        let sort = coord.start_search(&query("elf"), true);
        tokio::time::advance(Duration::from_millis(3_001)).await;

        let typing = coord.start_search(&query("goblin"), false);
        assert!(coord.may_commit(&typing));
        assert!(!coord.may_commit(&sort));
        assert!(coord.priority_token().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_release_is_delayed_after_completion() {
        let coord = coordinator();
        let sort = coord.start_search(&query("elf"), true);
        assert!(coord.commit(&sort).is_ok());
        coord.complete_search(&sort);

        // Still held immediately after completion.
        let early = coord.start_search(&query("goblin"), false);
        assert!(!coord.may_commit(&early));

        tokio::time::advance(Duration::from_millis(251)).await;
        let late = coord.start_search(&query("goblin"), false);
        assert!(coord.may_commit(&late));
        assert!(coord.priority_token().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_priority_search_replaces_first() {
        let coord = coordinator();
        let first = coord.start_search(&query("elf"), true);
        let second = coord.start_search(&query("elf"), true);
        assert!(!coord.may_commit(&first));
        assert!(coord.may_commit(&second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_spaces_ordinary_searches() {
        let coord = coordinator();
        let start = Instant::now();

        let a = coord.start_search(&query("a"), false);
        coord.pace(&a).await;
        assert_eq!(Instant::now(), start);

        let b = coord.start_search(&query("ab"), false);
        coord.pace(&b).await;
        assert_eq!(Instant::now() - start, Duration::from_millis(150));

        let p = coord.start_search(&query("ab"), true);
        coord.pace(&p).await;
        assert_eq!(Instant::now() - start, Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_cancels_superseded_request() {
        let coord = coordinator();
        let a = coord.start_search(&query("a"), false);
        let _b = coord.start_search(&query("ab"), false);
        assert!(coord.check(&a).is_err());
        assert_eq!(coord.phase(&a), RequestPhase::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_phase_tracks_outstanding_requests() {
        let coord = coordinator();
        assert_eq!(coord.surface_phase(), RequestPhase::Idle);

        let a = coord.start_search(&query("a"), false);
        assert_eq!(coord.surface_phase(), RequestPhase::Fetching);
        assert_eq!(coord.in_flight(), 1);

        coord.commit(&a).unwrap();
        coord.complete_search(&a);
        assert_eq!(coord.surface_phase(), RequestPhase::Committed);
        assert_eq!(coord.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_completes_as_cancelled() {
        let coord = coordinator();
        let a = coord.start_search(&query("a"), false);
        coord.cancel(&a);
        coord.complete_search(&a);
        assert_eq!(coord.phase(&a), RequestPhase::Cancelled);
        assert_eq!(coord.surface_phase(), RequestPhase::Cancelled);
    }
}
