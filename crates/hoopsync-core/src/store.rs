//! Storage traits: the master record store, the scrape log and the run log.
//!
//! The traits are implemented by storage backends (e.g.
//! `hoopsync-store-sqlite`). The sync engine depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  artifact::{ArtifactEntry, ArtifactKind},
  event::{Event, EventId},
  lifecycle::LifecycleState,
  merge::{MergeReport, Record, RecordKind},
  roster::{Player, PlayerId, Team, TeamId},
};

// ─── Master store ────────────────────────────────────────────────────────────

/// Counts over the whole store, for operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSummary {
  pub events_by_state: Vec<(LifecycleState, u64)>,
  pub teams:           u64,
  pub players:         u64,
  pub artifact_rows:   u64,
}

/// The append/merge/dedup engine over games, teams, players and artifacts.
///
/// Every successful `merge` is durable before its future resolves. Records
/// are never deleted; the only way back for an event is [`reset_event`].
///
/// [`reset_event`]: MasterStore::reset_event
pub trait MasterStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert `record` or fold it into the stored copy with the same identity.
  fn merge(
    &self,
    record: Record,
  ) -> impl Future<Output = Result<MergeReport, Self::Error>> + Send + '_;

  /// Administrative reset: return an event to `Unseen` and clear its
  /// artifact flags so the next run captures it again. Returns `false` if the
  /// event is unknown.
  fn reset_event<'a>(
    &'a self,
    event_id: &'a EventId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Capability queries ────────────────────────────────────────────────

  fn exists<'a>(
    &'a self,
    kind: RecordKind,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Whether `kind` still has to be captured for the event. Independent of
  /// the event's lifecycle state; unknown events always need it.
  fn needs_artifact<'a>(
    &'a self,
    event_id: &'a EventId,
    kind: ArtifactKind,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_event<'a>(
    &'a self,
    event_id: &'a EventId,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + 'a;

  /// All events whose game date is `date`.
  fn events_on(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Every known team, ordered by id.
  fn teams(&self) -> impl Future<Output = Result<Vec<Team>, Self::Error>> + Send + '_;

  fn get_team<'a>(
    &'a self,
    team_id: &'a TeamId,
  ) -> impl Future<Output = Result<Option<Team>, Self::Error>> + Send + 'a;

  fn get_player<'a>(
    &'a self,
    player_id: &'a PlayerId,
  ) -> impl Future<Output = Result<Option<Player>, Self::Error>> + Send + 'a;

  /// Players last observed with `team_id`.
  fn players_of<'a>(
    &'a self,
    team_id: &'a TeamId,
  ) -> impl Future<Output = Result<Vec<Player>, Self::Error>> + Send + 'a;

  /// Stored rows of one artifact kind, ordered by sub-key.
  fn artifacts<'a>(
    &'a self,
    event_id: &'a EventId,
    kind: ArtifactKind,
  ) -> impl Future<Output = Result<Vec<ArtifactEntry>, Self::Error>> + Send + 'a;

  fn summary(&self) -> impl Future<Output = Result<StoreSummary, Self::Error>> + Send + '_;
}

// ─── Scrape log ──────────────────────────────────────────────────────────────

/// Durable set of (date, scope) pairs whose candidate set was fully and
/// successfully processed, plus the (team, season) rosters already captured.
pub trait ScrapeLog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Mark a date complete. Returns `false` if it already was.
  fn add<'a>(
    &'a self,
    date: NaiveDate,
    scope: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn contains<'a>(
    &'a self,
    date: NaiveDate,
    scope: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Operator override. Returns `false` if the date was not marked.
  fn remove<'a>(
    &'a self,
    date: NaiveDate,
    scope: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Completed dates for `scope`, oldest first.
  fn completed<'a>(
    &'a self,
    scope: &'a str,
  ) -> impl Future<Output = Result<Vec<NaiveDate>, Self::Error>> + Send + 'a;

  // ── Rosters ───────────────────────────────────────────────────────────

  /// Mark a team's roster captured for `season`. Returns `false` if it
  /// already was.
  fn add_roster<'a>(
    &'a self,
    team_id: &'a TeamId,
    season: i32,
    scope: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn has_roster<'a>(
    &'a self,
    team_id: &'a TeamId,
    season: i32,
    scope: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Operator override, so the next roster run fetches the team again.
  fn remove_roster<'a>(
    &'a self,
    team_id: &'a TeamId,
    season: i32,
    scope: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

// ─── Run log ─────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunMode {
  Live,
  Backfill,
  /// Per-team season rosters rather than dated events.
  Roster,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunPhase {
  Start,
  Enumerating,
  Fetching,
  Merging,
  Completed,
  PartiallyCompleted,
  /// Stopped by a persistence failure.
  Aborted,
}

/// One row of run history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
  pub run_id:      Uuid,
  pub mode:        RunMode,
  pub started_at:  DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
  pub phase:       RunPhase,
  pub candidates:  u64,
  pub fetched:     u64,
  pub skipped:     u64,
  pub failed:      u64,
  pub conflicts:   u64,
}

pub trait RunLog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn start_run<'a>(
    &'a self,
    run: &'a RunRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn finish_run<'a>(
    &'a self,
    run: &'a RunRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Most recent runs first.
  fn recent_runs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<RunRecord>, Self::Error>> + Send + '_;
}
