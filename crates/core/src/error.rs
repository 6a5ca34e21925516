//! Error types for cardscroll
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Category | Variants | Surfaced to the UI |
//! |----------|----------|--------------------|
//! | Remote | `Network`, `InvalidQuery` | yes, previous state is kept |
//! | Pagination | `Exhausted` | yes, disables "load more" |
//! | Arbitration | `StaleResultDiscarded` | no, logged and dropped |
//! | State | `NoActiveSearch` | yes |
//! | Setup | `InvalidConfig` | yes |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for cardscroll operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the search cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum Error {
    /// Transport failure talking to the remote search API
    #[error("network error: {reason}")]
    Network {
        /// What went wrong on the wire
        reason: String,
    },

    /// The query was rejected, either locally or by the remote API
    #[error("invalid query: {reason}")]
    InvalidQuery {
        /// Why the query is not acceptable
        reason: String,
    },

    /// More pages were requested than the remote API promised
    #[error("result set exhausted after page {page}")]
    Exhausted {
        /// Last page that was available
        page: u32,
    },

    /// A response arrived for a request that lost arbitration
    #[error("stale result discarded for request {token}")]
    StaleResultDiscarded {
        /// Id of the request token whose result was dropped
        token: u64,
    },

    /// "Load more" was requested before any search committed
    #[error("no active search")]
    NoActiveSearch,

    /// Configuration values are out of range or unparsable
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration
        reason: String,
    },
}

impl Error {
    /// Shorthand for [`Error::Network`]
    pub fn network(reason: impl Into<String>) -> Self {
        Error::Network {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::InvalidQuery`]
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Error::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::InvalidConfig`]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this error belongs in front of the user
    ///
    /// Stale discards are the expected outcome of request arbitration and
    /// never reach the UI.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Error::StaleResultDiscarded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_network() {
        let err = Error::network("connection refused");
        let msg = err.to_string();
        assert!(msg.contains("network error"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_error_display_invalid_query() {
        let err = Error::invalid_query("empty query");
        assert_eq!(err.to_string(), "invalid query: empty query");
    }

    #[test]
    fn test_error_display_exhausted() {
        let err = Error::Exhausted { page: 3 };
        assert!(err.to_string().contains("page 3"));
    }

    #[test]
    fn test_stale_discard_is_not_user_visible() {
        assert!(!Error::StaleResultDiscarded { token: 7 }.is_user_visible());
        assert!(Error::network("x").is_user_visible());
        assert!(Error::Exhausted { page: 1 }.is_user_visible());
        assert!(Error::NoActiveSearch.is_user_visible());
    }

    #[test]
    fn test_error_serializes_with_variant_tag() {
        let err = Error::InvalidQuery {
            reason: "bad".into(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("InvalidQuery"));
        let back: Error = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
