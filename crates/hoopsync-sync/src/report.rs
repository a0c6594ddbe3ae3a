//! Per-run summary handed back to the caller and persisted in the run log.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use hoopsync_core::{
  ClassificationError, FetchError,
  event::EventId,
  roster::TeamId,
  store::{RunMode, RunPhase, RunRecord},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// Retries were exhausted; likely to succeed on a later run.
  TransientFetch,
  PermanentFetch,
  Classification,
}

impl From<&FetchError> for FailureKind {
  fn from(e: &FetchError) -> Self {
    match e {
      FetchError::Exhausted { .. } => Self::TransientFetch,
      e if e.is_transient() => Self::TransientFetch,
      _ => Self::PermanentFetch,
    }
  }
}

/// One candidate that did not make it: an event, a date's schedule when
/// neither id is set, or a team's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFailure {
  pub date:     NaiveDate,
  pub event_id: Option<EventId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub team_id:  Option<TeamId>,
  pub kind:     FailureKind,
  pub message:  String,
}

impl CandidateFailure {
  pub fn fetch(date: NaiveDate, event_id: Option<EventId>, error: &FetchError) -> Self {
    Self { date, event_id, team_id: None, kind: error.into(), message: error.to_string() }
  }

  /// A roster fetch that failed on the run's `date`.
  pub fn roster(date: NaiveDate, team_id: TeamId, error: &FetchError) -> Self {
    Self {
      date,
      event_id: None,
      team_id: Some(team_id),
      kind: error.into(),
      message: error.to_string(),
    }
  }

  pub fn classification(date: NaiveDate, event_id: EventId, error: &ClassificationError) -> Self {
    Self {
      date,
      event_id: Some(event_id),
      team_id: None,
      kind: FailureKind::Classification,
      message: error.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
  pub run_id:          Uuid,
  pub mode:            RunMode,
  pub phase:           RunPhase,
  pub started_at:      DateTime<Utc>,
  pub finished_at:     Option<DateTime<Utc>>,
  pub dates_total:     u64,
  /// Dates passed over because the scrape log already had them.
  pub dates_skipped:   u64,
  /// Dates newly appended to the scrape log.
  pub dates_completed: u64,
  pub candidates:      u64,
  /// Candidates filtered out before any network call.
  pub skipped:         u64,
  /// Candidates that went to the provider.
  pub fetched:         u64,
  /// Merges that changed the store.
  pub merged:          u64,
  pub conflicts:       u64,
  pub failures:        Vec<CandidateFailure>,
  /// The run stopped early on request.
  pub cancelled:       bool,
}

impl RunReport {
  pub fn new(run_id: Uuid, mode: RunMode, started_at: DateTime<Utc>) -> Self {
    Self {
      run_id,
      mode,
      phase: RunPhase::Start,
      started_at,
      finished_at: None,
      dates_total: 0,
      dates_skipped: 0,
      dates_completed: 0,
      candidates: 0,
      skipped: 0,
      fetched: 0,
      merged: 0,
      conflicts: 0,
      failures: Vec::new(),
      cancelled: false,
    }
  }

  /// Close the report: `Completed` only when nothing failed and nothing was
  /// left undone.
  pub fn finish(&mut self, at: DateTime<Utc>) {
    self.finished_at = Some(at);
    self.phase = if self.failures.is_empty() && !self.cancelled {
      RunPhase::Completed
    } else {
      RunPhase::PartiallyCompleted
    };
  }

  pub fn abort(&mut self, at: DateTime<Utc>) {
    self.finished_at = Some(at);
    self.phase = RunPhase::Aborted;
  }

  pub fn counts_by_kind(&self) -> BTreeMap<FailureKind, usize> {
    let mut counts = BTreeMap::new();
    for failure in &self.failures {
      *counts.entry(failure.kind).or_default() += 1;
    }
    counts
  }

  pub fn failed_ids(&self) -> Vec<&EventId> {
    self.failures.iter().filter_map(|f| f.event_id.as_ref()).collect()
  }

  /// The run-log row for this report.
  pub fn record(&self) -> RunRecord {
    RunRecord {
      run_id:      self.run_id,
      mode:        self.mode,
      started_at:  self.started_at,
      finished_at: self.finished_at,
      phase:       self.phase,
      candidates:  self.candidates,
      fetched:     self.fetched,
      skipped:     self.skipped,
      failed:      self.failures.len() as u64,
      conflicts:   self.conflicts,
    }
  }
}
