//! Cache configuration via `cardscroll.toml`
//!
//! Sizes and timings are fixed per deployment. On first run a commented
//! default file is written; edit it and restart to change settings.

use std::path::Path;
use std::time::Duration;

use cardscroll_core::{
    Error, Limits, Result, DEFAULT_DISPLAY_BATCH_SIZE, DEFAULT_PRIORITY_RELEASE,
    DEFAULT_PRIORITY_WINDOW, DEFAULT_REMOTE_PAGE_SIZE, DEFAULT_SEARCH_SPACING,
};
use cardscroll_remote::RemoteConfig;
use serde::{Deserialize, Serialize};

use crate::pagination::BatchFill;
use crate::sort::ServerSortPolicy;

/// Config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "cardscroll.toml";

/// Area a cache owns unless configured otherwise
pub const DEFAULT_AREA: &str = "collection";

/// Search cache configuration loaded from `cardscroll.toml`.
///
/// # Example
///
/// ```toml
/// area = "collection"
/// remote_page_size = 175
/// display_batch_size = 75
/// server_sort = "batch-threshold"
///
/// [remote]
/// endpoint = "https://api.scryfall.com/cards/search"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Logical sort area owned by the cache
    #[serde(default = "default_area")]
    pub area: String,
    /// Cards per remote page
    #[serde(default = "default_remote_page_size")]
    pub remote_page_size: usize,
    /// Cards per "load more"
    #[serde(default = "default_display_batch_size")]
    pub display_batch_size: usize,
    /// Minimum spacing between ordinary searches, in milliseconds
    #[serde(default = "default_search_spacing_ms")]
    pub search_spacing_ms: u64,
    /// Immunity window of sort-triggered searches, in milliseconds
    #[serde(default = "default_priority_window_ms")]
    pub priority_window_ms: u64,
    /// Delay between a priority search finishing and its release, in milliseconds
    #[serde(default = "default_priority_release_ms")]
    pub priority_release_ms: u64,
    /// When a sort change goes back to the server
    #[serde(default)]
    pub server_sort: ServerSortPolicy,
    /// How batches crossing a page boundary are served
    #[serde(default)]
    pub batch_fill: BatchFill,
    /// Remote API settings
    #[serde(default)]
    pub remote: RemoteConfig,
}

fn default_area() -> String {
    DEFAULT_AREA.to_string()
}

fn default_remote_page_size() -> usize {
    DEFAULT_REMOTE_PAGE_SIZE
}

fn default_display_batch_size() -> usize {
    DEFAULT_DISPLAY_BATCH_SIZE
}

fn default_search_spacing_ms() -> u64 {
    DEFAULT_SEARCH_SPACING.as_millis() as u64
}

fn default_priority_window_ms() -> u64 {
    DEFAULT_PRIORITY_WINDOW.as_millis() as u64
}

fn default_priority_release_ms() -> u64 {
    DEFAULT_PRIORITY_RELEASE.as_millis() as u64
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            area: default_area(),
            remote_page_size: default_remote_page_size(),
            display_batch_size: default_display_batch_size(),
            search_spacing_ms: default_search_spacing_ms(),
            priority_window_ms: default_priority_window_ms(),
            priority_release_ms: default_priority_release_ms(),
            server_sort: ServerSortPolicy::default(),
            batch_fill: BatchFill::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Sizes and timings as [`Limits`]
    pub fn limits(&self) -> Limits {
        Limits {
            remote_page_size: self.remote_page_size,
            display_batch_size: self.display_batch_size,
            search_spacing: Duration::from_millis(self.search_spacing_ms),
            priority_window: Duration::from_millis(self.priority_window_ms),
            priority_release: Duration::from_millis(self.priority_release_ms),
        }
    }

    /// Check the values can drive a cache
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for zero sizes, a display batch larger than a remote
    /// page, or an empty area name.
    pub fn validate(&self) -> Result<()> {
        if self.area.trim().is_empty() {
            return Err(Error::invalid_config("area must not be empty"));
        }
        self.limits().validate()
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# cardscroll configuration
#
# Logical sort area this cache owns.
area = "collection"

# Page size of the remote search API and cards handed out per "load more".
# Both are fixed by the deployment; the batch may not exceed the page.
remote_page_size = 175
display_batch_size = 75

# Timings in milliseconds.
#   search_spacing_ms   = minimum gap between searches while typing
#   priority_window_ms  = how long a sort-triggered search cannot be pre-empted
#   priority_release_ms = grace period after a sort-triggered search finishes
search_spacing_ms = 150
priority_window_ms = 3000
priority_release_ms = 250

# When a sort change re-queries the server:
#   "batch-threshold"  = more results than one display batch (default)
#   "unloaded-results" = some results are not loaded yet
server_sort = "batch-threshold"

# Batches that cross a remote page boundary:
#   "page-aligned" = hand out the short remainder, fetch on the next batch (default)
#   "top-up"       = fetch the next page immediately and fill the batch
batch_fill = "page-aligned"

[remote]
endpoint = "https://api.scryfall.com/cards/search"
timeout_ms = 10000
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: CacheConfig = toml::from_str(&content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::invalid_config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::invalid_config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_deployment() {
        let config = CacheConfig::default();
        assert_eq!(config.area, "collection");
        assert_eq!(config.limits(), Limits::default());
        assert_eq!(config.server_sort, ServerSortPolicy::BatchThreshold);
        assert_eq!(config.batch_fill, BatchFill::PageAligned);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_toml_parses_to_default() {
        let config: CacheConfig = toml::from_str(CacheConfig::default_toml()).unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn parse_policies() {
        let config: CacheConfig =
            toml::from_str("server_sort = \"unloaded-results\"\nbatch_fill = \"top-up\"").unwrap();
        assert_eq!(config.server_sort, ServerSortPolicy::UnloadedResults);
        assert_eq!(config.batch_fill, BatchFill::TopUp);
    }

    #[test]
    fn parse_unknown_policy_fails() {
        assert!(toml::from_str::<CacheConfig>("server_sort = \"always\"").is_err());
    }

    #[test]
    fn batch_larger_than_page_is_invalid() {
        let config = CacheConfig {
            remote_page_size: 50,
            display_batch_size: 75,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn empty_area_is_invalid() {
        let config = CacheConfig {
            area: "  ".to_string(),
            ..CacheConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        CacheConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());

        let config = CacheConfig::from_file(&path).unwrap();
        assert_eq!(config.display_batch_size, 75);
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(&path, "display_batch_size = 50\n").unwrap();
        CacheConfig::write_default_if_missing(&path).unwrap();

        let config = CacheConfig::from_file(&path).unwrap();
        assert_eq!(config.display_batch_size, 50);
    }

    #[test]
    fn from_file_with_missing_fields_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "").unwrap();

        let config = CacheConfig::from_file(&path).unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn from_file_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "remote_page_size = 0\n").unwrap();

        assert!(CacheConfig::from_file(&path).is_err());
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let config = CacheConfig {
            area: "decks".to_string(),
            search_spacing_ms: 0,
            batch_fill: BatchFill::TopUp,
            remote: RemoteConfig {
                endpoint: "http://localhost:8080/search".to_string(),
                timeout_ms: 2000,
            },
            ..CacheConfig::default()
        };

        config.write_to_file(&path).unwrap();
        let loaded = CacheConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
