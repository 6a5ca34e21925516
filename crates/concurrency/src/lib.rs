//! Concurrency layer for cardscroll
//!
//! This crate arbitrates overlapping searches with:
//! - RequestToken: identity of one in-flight search
//! - SearchRequestCoordinator: current/priority token bookkeeping
//! - Commit-time arbitration (`may_commit` / `commit`)
//! - Pacing of ordinary searches while typing
//!
//! It never calls the remote API itself; callers run the fetch between
//! `pace` and `commit`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod token;

pub use coordinator::{SearchGuard, SearchRequestCoordinator};
pub use token::{RequestPhase, RequestToken};
