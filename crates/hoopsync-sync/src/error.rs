//! Error type for `hoopsync-sync`.
//!
//! Per-candidate failures are not errors here; they are collected in the
//! [`RunReport`]. Only failures that stop a run surface as [`SyncError`].

use thiserror::Error;

use crate::report::RunReport;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SyncError {
  /// The store rejected a write or read. Everything merged before the
  /// failure stays committed.
  #[error("persistence failure, run aborted: {source}")]
  Persistence {
    source: BoxError,
    report: Box<RunReport>,
  },

  #[error(transparent)]
  InvalidRange(#[from] hoopsync_core::Error),

  #[error("invalid configuration: {0}")]
  Config(String),
}

pub(crate) fn boxed<E: std::error::Error + Send + Sync + 'static>(e: E) -> BoxError {
  Box::new(e)
}
