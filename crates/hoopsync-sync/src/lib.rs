//! The incremental synchronisation engine.
//!
//! [`SyncEngine`] drives one run in live or backfill mode: it enumerates the
//! scope's events, filters out everything the store already holds in full,
//! fetches the rest through a shared [`RateLimiter`], classifies and merges
//! the results, and records the outcome in a [`RunReport`].

pub mod backoff;
pub mod config;
pub mod engine;
pub mod error;
pub mod limiter;
pub mod report;

pub use backoff::BackoffPolicy;
pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use error::{BoxError, SyncError};
pub use limiter::RateLimiter;
pub use report::{CandidateFailure, FailureKind, RunReport};
