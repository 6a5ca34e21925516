//! Sort coordination
//!
//! Publish/subscribe hub that decouples "the user changed the sort order"
//! from "how that change is satisfied". Components subscribe per logical
//! area (e.g. `"collection"`). On a sort change the coordinator decides from
//! the area's last recorded results whether the new order needs a fresh
//! server query, then broadcasts a [`SortChangeEvent`] to that area's
//! subscribers.
//!
//! The coordinator never starts searches itself; the search-owning subscriber
//! reacts to `requires_server_search`.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use cardscroll_core::{Error, PaginationState, Result, SortCriteria, SortDirection, SortSpec};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// When a sort change must go back to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerSortPolicy {
    /// `total_cards > display_batch_size`
    #[default]
    BatchThreshold,
    /// `total_cards > loaded_cards`
    UnloadedResults,
}

impl ServerSortPolicy {
    /// Config spelling of the variant
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerSortPolicy::BatchThreshold => "batch-threshold",
            ServerSortPolicy::UnloadedResults => "unloaded-results",
        }
    }

    fn requires_server_search(&self, results: &AreaResults) -> bool {
        match self {
            ServerSortPolicy::BatchThreshold => results.total_cards > results.display_batch_size,
            ServerSortPolicy::UnloadedResults => results.total_cards > results.loaded_cards,
        }
    }
}

impl FromStr for ServerSortPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "batch-threshold" => Ok(ServerSortPolicy::BatchThreshold),
            "unloaded-results" => Ok(ServerSortPolicy::UnloadedResults),
            other => Err(Error::invalid_config(format!(
                "unknown server_sort '{}', expected \"batch-threshold\" or \"unloaded-results\"",
                other
            ))),
        }
    }
}

/// Broadcast to an area's subscribers on every effective sort change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortChangeEvent {
    /// Area whose sort changed
    pub area: String,
    /// New sort state of the area
    pub sort: SortSpec,
    /// Not every result is loaded client-side; re-query the server
    pub requires_server_search: bool,
}

/// Handle returned by [`SortCoordinator::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Callback invoked with each event for the subscribed area
pub type SortCallback = Arc<dyn Fn(&SortChangeEvent) + Send + Sync>;

/// Result counts the server-sort decision is based on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AreaResults {
    total_cards: usize,
    loaded_cards: usize,
    display_batch_size: usize,
}

struct Subscription {
    id: SubscriptionId,
    area: String,
    callback: SortCallback,
}

#[derive(Default)]
struct SortRegistry {
    sorts: HashMap<String, SortSpec>,
    results: HashMap<String, AreaResults>,
    subscriptions: Vec<Subscription>,
}

/// Per-area sort state plus the subscribers interested in it
pub struct SortCoordinator {
    next_id: AtomicU64,
    policy: ServerSortPolicy,
    registry: Mutex<SortRegistry>,
}

impl SortCoordinator {
    /// Coordinator deciding server sorts with `policy`
    pub fn new(policy: ServerSortPolicy) -> Self {
        SortCoordinator {
            next_id: AtomicU64::new(1),
            policy,
            registry: Mutex::new(SortRegistry::default()),
        }
    }

    /// Policy in effect
    pub fn policy(&self) -> ServerSortPolicy {
        self.policy
    }

    /// Register `callback` for sort changes in `area`
    pub fn subscribe<F>(&self, area: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&SortChangeEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let area = area.into();
        debug!(target: "cardscroll::sort", area = %area, id = id.0, "Subscribed");
        self.registry.lock().subscriptions.push(Subscription {
            id,
            area,
            callback: Arc::new(callback),
        });
        id
    }

    /// Register `callback` and tie its lifetime to the returned guard
    pub fn subscribe_guarded<F>(self: &Arc<Self>, area: impl Into<String>, callback: F) -> SubscriptionGuard
    where
        F: Fn(&SortChangeEvent) + Send + Sync + 'static,
    {
        let id = self.subscribe(area, callback);
        SubscriptionGuard {
            coordinator: Arc::downgrade(self),
            id,
        }
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.subscriptions.len();
        registry.subscriptions.retain(|sub| sub.id != id);
        let removed = registry.subscriptions.len() != before;
        if removed {
            debug!(target: "cardscroll::sort", id = id.0, "Unsubscribed");
        }
        removed
    }

    /// Number of live subscriptions for `area`
    pub fn subscriber_count(&self, area: &str) -> usize {
        self.registry
            .lock()
            .subscriptions
            .iter()
            .filter(|sub| sub.area == area)
            .count()
    }

    /// Record the result counts of the area's latest committed search
    pub fn record_results(&self, area: &str, state: &PaginationState) {
        self.registry.lock().results.insert(
            area.to_string(),
            AreaResults {
                total_cards: state.total_cards,
                loaded_cards: state.loaded_cards,
                display_batch_size: state.display_batch_size,
            },
        );
    }

    /// Forget the area's results; later sort changes only store the preference
    pub fn clear_results(&self, area: &str) {
        self.registry.lock().results.remove(area);
    }

    /// Stored sort state for `area`, the default sort if none was set
    pub fn sort_for(&self, area: &str) -> SortSpec {
        self.registry
            .lock()
            .sorts
            .get(area)
            .copied()
            .unwrap_or_default()
    }

    /// Change the sort of `area`
    ///
    /// Returns the broadcast event, or `None` when nothing was broadcast:
    /// either the sort is unchanged, or no search has been recorded for the
    /// area yet and the preference was only stored for the next search.
    ///
    /// Callbacks run after the internal lock is released, so they may call
    /// back into the coordinator.
    pub fn set_sort(
        &self,
        area: &str,
        criteria: SortCriteria,
        direction: SortDirection,
    ) -> Option<SortChangeEvent> {
        let sort = SortSpec::new(criteria, direction);

        let (event, callbacks) = {
            let mut registry = self.registry.lock();
            let previous = registry
                .sorts
                .insert(area.to_string(), sort)
                .unwrap_or_default();
            if previous == sort {
                debug!(target: "cardscroll::sort", area, sort = %sort, "Sort unchanged");
                return None;
            }
            self.prepare(&registry, area, sort)?
        };

        Some(self.dispatch(event, callbacks))
    }

    /// Broadcast the stored sort of `area` again
    ///
    /// For subscribers whose last attempt to apply the sort did not land
    /// (the re-query failed or lost arbitration). Returns `None` when no
    /// search has been recorded for the area.
    pub fn resend_sort(&self, area: &str) -> Option<SortChangeEvent> {
        let (event, callbacks) = {
            let registry = self.registry.lock();
            let sort = registry.sorts.get(area).copied().unwrap_or_default();
            self.prepare(&registry, area, sort)?
        };
        Some(self.dispatch(event, callbacks))
    }

    fn prepare(
        &self,
        registry: &SortRegistry,
        area: &str,
        sort: SortSpec,
    ) -> Option<(SortChangeEvent, Vec<SortCallback>)> {
        let results = match registry.results.get(area) {
            Some(results) => *results,
            None => {
                debug!(
                    target: "cardscroll::sort",
                    area,
                    sort = %sort,
                    "No search yet; sort stored for the next search"
                );
                return None;
            }
        };

        let event = SortChangeEvent {
            area: area.to_string(),
            sort,
            requires_server_search: self.policy.requires_server_search(&results),
        };
        let callbacks = registry
            .subscriptions
            .iter()
            .filter(|sub| sub.area == area)
            .map(|sub| Arc::clone(&sub.callback))
            .collect();
        Some((event, callbacks))
    }

    fn dispatch(&self, event: SortChangeEvent, callbacks: Vec<SortCallback>) -> SortChangeEvent {
        info!(
            target: "cardscroll::sort",
            area = %event.area,
            sort = %event.sort,
            server = event.requires_server_search,
            subscribers = callbacks.len(),
            "Sort changed"
        );
        for callback in callbacks {
            callback(&event);
        }
        event
    }
}

impl Default for SortCoordinator {
    fn default() -> Self {
        Self::new(ServerSortPolicy::default())
    }
}

/// Unsubscribes when dropped
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard {
    coordinator: Weak<SortCoordinator>,
    id: SubscriptionId,
}

impl SubscriptionGuard {
    /// Id of the guarded subscription
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(coordinator) = self.coordinator.upgrade() {
            coordinator.unsubscribe(self.id);
        }
    }
}
