//! HTTP implementation of [`RemoteSearchClient`]
//!
//! Sends one GET per page with the query encoded as URL parameters. Status
//! mapping:
//! - transport failure, timeout, 5xx, undecodable body → `Network`
//! - 400 / 422 → `InvalidQuery` (with the API's `details` when present)

use std::time::Duration;

use async_trait::async_trait;
use cardscroll_core::{Error, RemotePage, Result, SearchQuery};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::RemoteSearchClient;
use crate::wire::{ApiErrorBody, ApiRequest, ApiResponse};

/// Default search endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.scryfall.com/cards/search";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Connection settings for the remote search API
///
/// Persisted under the `[remote]` section of the cache config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Search endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// reqwest-backed search client
pub struct HttpSearchClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSearchClient {
    /// Build a client from connection settings
    ///
    /// # Errors
    ///
    /// Returns `Network` if the TLS backend cannot be initialised.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("cardscroll/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::network(format!("failed to build http client: {}", e)))?;

        Ok(HttpSearchClient {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Endpoint this client talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::network("request timed out")
    } else {
        Error::network(e.to_string())
    }
}

#[async_trait]
impl RemoteSearchClient for HttpSearchClient {
    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<RemotePage> {
        let request = ApiRequest::from_query(query, page)?;

        debug!(
            target: "cardscroll::remote",
            query = %request.query,
            page,
            order = request.order,
            direction = request.direction,
            "Fetching remote page"
        );

        let response = self
            .client
            .get(&self.endpoint)
            .query(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            let reason = ApiErrorBody::details_from(&body)
                .unwrap_or_else(|| format!("rejected by remote API ({})", status));
            warn!(target: "cardscroll::remote", %status, reason = %reason, "Query rejected");
            return Err(Error::InvalidQuery { reason });
        }
        if !status.is_success() {
            warn!(target: "cardscroll::remote", %status, "Remote API returned an error status");
            return Err(Error::network(format!("HTTP {}", status)));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::network(format!("malformed response: {}", e)))?;

        Ok(body.into_page(page))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
