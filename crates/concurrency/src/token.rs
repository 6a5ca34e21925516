//! Request tokens and request phases

use serde::Serialize;
use tokio::time::Instant;

/// Identity of one in-flight search
///
/// A token lives exactly as long as its search. The coordinator compares it
/// against the current token and the priority token to decide whether the
/// search may commit its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    id: u64,
    is_priority: bool,
    issued_at: Instant,
}

impl RequestToken {
    pub(crate) fn new(id: u64, is_priority: bool, issued_at: Instant) -> Self {
        RequestToken {
            id,
            is_priority,
            issued_at,
        }
    }

    /// Monotonically increasing id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this search was sort-triggered
    pub fn is_priority(&self) -> bool {
        self.is_priority
    }

    /// When the token was minted
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }
}

/// Lifecycle of a search
///
/// ```text
/// Idle → Fetching → Committed
///                 → Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPhase {
    /// Nothing issued yet
    #[default]
    Idle,
    /// Issued and not yet resolved
    Fetching,
    /// Results were applied to the cache
    Committed,
    /// Results were discarded or the fetch failed
    Cancelled,
}

impl RequestPhase {
    /// Whether the phase is terminal
    pub fn is_finished(&self) -> bool {
        matches!(self, RequestPhase::Committed | RequestPhase::Cancelled)
    }
}
