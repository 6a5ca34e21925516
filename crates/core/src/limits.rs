//! Deployment limits shared by the pagination and sort layers
//!
//! The remote page size is fixed by the search API and the display batch size
//! is fixed by the UI. Both must be the same values everywhere: the page
//! tracker slices with them and the sort coordinator derives its server-sort
//! threshold from the display batch.

use crate::error::{Error, Result};
use std::time::Duration;

/// Cards per remote page returned by the search API
pub const DEFAULT_REMOTE_PAGE_SIZE: usize = 175;

/// Cards handed to the UI per "load more"
pub const DEFAULT_DISPLAY_BATCH_SIZE: usize = 75;

/// Minimum spacing between two ordinary (non-priority) searches
pub const DEFAULT_SEARCH_SPACING: Duration = Duration::from_millis(150);

/// How long a sort-triggered search is immune to pre-emption
pub const DEFAULT_PRIORITY_WINDOW: Duration = Duration::from_millis(3000);

/// Grace period between a priority search completing and its token release
pub const DEFAULT_PRIORITY_RELEASE: Duration = Duration::from_millis(250);

/// Query text sent when the user has filters but no free text
pub const WILDCARD_QUERY: &str = "*";

/// Fixed sizes and timings of one deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Remote page size (default: 175)
    pub remote_page_size: usize,

    /// Display batch size (default: 75)
    pub display_batch_size: usize,

    /// Ordinary search spacing (default: 150ms)
    pub search_spacing: Duration,

    /// Priority window (default: 3s)
    pub priority_window: Duration,

    /// Priority release delay (default: 250ms)
    pub priority_release: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            remote_page_size: DEFAULT_REMOTE_PAGE_SIZE,
            display_batch_size: DEFAULT_DISPLAY_BATCH_SIZE,
            search_spacing: DEFAULT_SEARCH_SPACING,
            priority_window: DEFAULT_PRIORITY_WINDOW,
            priority_release: DEFAULT_PRIORITY_RELEASE,
        }
    }
}

impl Limits {
    /// Limits with explicit page and batch sizes, default timings
    pub fn with_sizes(remote_page_size: usize, display_batch_size: usize) -> Self {
        Limits {
            remote_page_size,
            display_batch_size,
            ..Limits::default()
        }
    }

    /// Check that the sizes can drive a pagination session
    ///
    /// Both sizes must be non-zero and a display batch may not be larger
    /// than one remote page.
    pub fn validate(&self) -> Result<()> {
        if self.remote_page_size == 0 {
            return Err(Error::invalid_config("remote_page_size must be > 0"));
        }
        if self.display_batch_size == 0 {
            return Err(Error::invalid_config("display_batch_size must be > 0"));
        }
        if self.display_batch_size > self.remote_page_size {
            return Err(Error::invalid_config(format!(
                "display_batch_size ({}) exceeds remote_page_size ({})",
                self.display_batch_size, self.remote_page_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_match_deployment() {
        let limits = Limits::default();
        assert_eq!(limits.remote_page_size, 175);
        assert_eq!(limits.display_batch_size, 75);
        assert_eq!(limits.search_spacing, Duration::from_millis(150));
        assert!(limits.validate().is_ok());
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(Limits::with_sizes(0, 10).validate().is_err());
        assert!(Limits::with_sizes(10, 0).validate().is_err());
    }

    #[test]
    fn test_batch_larger_than_page_rejected() {
        let err = Limits::with_sizes(50, 75).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }
}
