//! Remote search API adapter for cardscroll
//!
//! This crate provides:
//! - RemoteSearchClient trait: one (query, page) → one fetch, no state
//! - HttpSearchClient: reqwest implementation against the JSON search API
//! - InMemorySearchClient: corpus-backed implementation for offline use
//! - Wire types for the request parameters and response bodies

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod http;
pub mod memory;
pub mod wire;

pub use client::RemoteSearchClient;
pub use http::{HttpSearchClient, RemoteConfig, DEFAULT_ENDPOINT};
pub use memory::{FetchRecord, InMemorySearchClient, REQUEST_LOG_CAPACITY};
pub use wire::{ApiErrorBody, ApiRequest, ApiResponse};
