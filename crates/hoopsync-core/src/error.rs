//! Error types for `hoopsync-core`.
//!
//! Fetch failures are split into transient and permanent classes; only the
//! transient ones are worth retrying.

use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

use crate::{artifact::ArtifactKind, event::EventId, lifecycle::LifecycleState};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid date range: {from} is after {to}")]
  InvalidDateRange { from: NaiveDate, to: NaiveDate },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Fetching ────────────────────────────────────────────────────────────────

/// A failed attempt to pull data from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  // ── Transient ───────────────────────────────────────────────────────────
  #[error("request timed out")]
  Timeout,

  #[error("rate limited by provider")]
  RateLimited {
    /// Wait hint from a `Retry-After` header, when the provider sent one.
    retry_after: Option<Duration>,
  },

  #[error("transport error: {0}")]
  Transport(String),

  #[error("server error: HTTP {0}")]
  Server(u16),

  // ── Permanent ───────────────────────────────────────────────────────────
  #[error("not found: {0}")]
  NotFound(String),

  #[error("malformed response: {0}")]
  Malformed(String),

  #[error("client error: HTTP {0}")]
  Client(u16),

  #[error("schema mismatch: {0}")]
  SchemaMismatch(String),

  /// Every retry was spent on transient failures.
  #[error("gave up after {attempts} attempts: {last}")]
  Exhausted {
    attempts: u32,
    last:     Box<FetchError>,
  },
}

impl FetchError {
  /// Whether another attempt could plausibly succeed.
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      Self::Timeout | Self::RateLimited { .. } | Self::Transport(_) | Self::Server(_)
    )
  }

  /// The provider's own wait hint, if any.
  pub fn retry_after(&self) -> Option<Duration> {
    match self {
      Self::RateLimited { retry_after } => *retry_after,
      _ => None,
    }
  }

  /// Map a non-success HTTP status onto the taxonomy.
  pub fn from_status(status: u16, what: &str) -> Self {
    match status {
      404 => Self::NotFound(what.to_owned()),
      429 => Self::RateLimited { retry_after: None },
      500..=599 => Self::Server(status),
      _ => Self::Client(status),
    }
  }
}

// ─── Classification ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
  #[error("unrecognized lifecycle status {0:?}")]
  UnrecognizedStatus(String),
}

// ─── Merging ─────────────────────────────────────────────────────────────────

/// A merge input that was rejected instead of applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeConflict {
  #[error("event {event_id}: lifecycle state {existing} would regress to {incoming}")]
  StateRegression {
    event_id: EventId,
    existing: LifecycleState,
    incoming: LifecycleState,
  },

  #[error("event {event_id}: {kind} rows arrived before the event itself")]
  OrphanArtifact {
    event_id: EventId,
    kind:     ArtifactKind,
  },
}
