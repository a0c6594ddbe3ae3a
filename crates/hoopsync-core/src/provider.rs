//! The `Provider` trait, the engine's only view of the upstream data source.
//!
//! Implementations (e.g. `hoopsync-espn`) own the wire format and the parsing;
//! the engine only sees these structured shapes or a typed [`FetchError`].

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  artifact::{ArtifactKind, ArtifactPayload},
  error::FetchError,
  event::{EventId, Score},
  roster::{Roster, Team, TeamId},
};

/// Raw status as reported by the provider; interpreted by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSignal {
  /// Machine-ish status, e.g. `"STATUS_FINAL"` or `"post"`.
  pub code:   String,
  /// Human-readable detail, e.g. `"Final/OT"`.
  pub detail: Option<String>,
}

/// One schedule entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStub {
  pub event_id:     EventId,
  pub scheduled_at: DateTime<Utc>,
  pub home:         Team,
  pub away:         Team,
  pub status:       StatusSignal,
}

/// The full event record as of the fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetail {
  pub event_id:     EventId,
  pub scheduled_at: DateTime<Utc>,
  pub home:         Team,
  pub away:         Team,
  pub status:       StatusSignal,
  pub score:        Option<Score>,
  pub venue:        Option<String>,
}

/// Abstraction over an upstream sports-data source.
///
/// All methods return `Send` futures so several fetches can be in flight at
/// once on a multi-threaded runtime.
pub trait Provider: Send + Sync {
  /// Every event scheduled on `date`, in provider order. One pass per call.
  fn fetch_schedule(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<EventStub>, FetchError>> + Send + '_;

  fn fetch_event_detail<'a>(
    &'a self,
    event_id: &'a EventId,
  ) -> impl Future<Output = Result<EventDetail, FetchError>> + Send + 'a;

  fn fetch_artifact<'a>(
    &'a self,
    event_id: &'a EventId,
    kind: ArtifactKind,
  ) -> impl Future<Output = Result<ArtifactPayload, FetchError>> + Send + 'a;

  /// The team's roster for `season` (named by the year it ends in).
  fn fetch_roster<'a>(
    &'a self,
    team_id: &'a TeamId,
    season: i32,
  ) -> impl Future<Output = Result<Roster, FetchError>> + Send + 'a;
}
