//! Field-by-field merge policy for folding a fresh observation into the
//! master copy of a record.
//!
//! The policy is pure; storage backends read the existing record, call into
//! here, and persist whatever comes back.
//!
//! - lifecycle state is monotonic (see [`LifecycleState::advance`]);
//! - artifact completion flags only ever turn on;
//! - volatile event fields follow the latest observation until the event is
//!   final, after which they are frozen;
//! - descriptive team/player fields are last-write-wins, but an absent
//!   incoming value never erases a present one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  artifact::ArtifactSet,
  error::MergeConflict,
  event::Event,
  lifecycle::{LifecycleState, Transition},
  roster::{Player, Team},
};

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
  Event,
  Team,
  Player,
  Artifact,
}

/// Anything the master store can merge.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
  Event(Event),
  Team(Team),
  Player(Player),
  Artifacts(ArtifactSet),
}

impl Record {
  pub fn kind(&self) -> RecordKind {
    match self {
      Self::Event(_) => RecordKind::Event,
      Self::Team(_) => RecordKind::Team,
      Self::Player(_) => RecordKind::Player,
      Self::Artifacts(_) => RecordKind::Artifact,
    }
  }

  /// The identity the record is looked up by. Artifact sets are keyed by
  /// their owning event.
  pub fn id(&self) -> &str {
    match self {
      Self::Event(e) => e.event_id.as_str(),
      Self::Team(t) => t.team_id.as_str(),
      Self::Player(p) => p.player_id.as_str(),
      Self::Artifacts(a) => a.event_id.as_str(),
    }
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
  Inserted,
  UpdatedFields(BTreeSet<&'static str>),
  NoOp,
}

/// What a merge did, plus anything it refused to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
  pub outcome:   MergeOutcome,
  pub conflicts: Vec<MergeConflict>,
}

impl MergeReport {
  pub fn inserted() -> Self {
    Self { outcome: MergeOutcome::Inserted, conflicts: Vec::new() }
  }

  pub fn no_op() -> Self { Self { outcome: MergeOutcome::NoOp, conflicts: Vec::new() } }

  pub fn conflict(conflict: MergeConflict) -> Self {
    Self { outcome: MergeOutcome::NoOp, conflicts: vec![conflict] }
  }

  pub fn from_changes(
    changed: BTreeSet<&'static str>,
    conflicts: Vec<MergeConflict>,
  ) -> Self {
    let outcome = if changed.is_empty() {
      MergeOutcome::NoOp
    } else {
      MergeOutcome::UpdatedFields(changed)
    };
    Self { outcome, conflicts }
  }

  pub fn is_no_op(&self) -> bool { self.outcome == MergeOutcome::NoOp }
}

/// A merged record together with the names of the fields that changed.
#[derive(Debug, Clone)]
pub struct Merged<T> {
  pub record:    T,
  pub changed:   BTreeSet<&'static str>,
  pub conflicts: Vec<MergeConflict>,
}

impl<T> Merged<T> {
  fn start(record: T) -> Self {
    Self { record, changed: BTreeSet::new(), conflicts: Vec::new() }
  }
}

// ─── Field policies ──────────────────────────────────────────────────────────

/// Overwrite when different.
fn replace<T: PartialEq + Clone>(
  field: &'static str,
  current: &mut T,
  incoming: &T,
  changed: &mut BTreeSet<&'static str>,
) {
  if current != incoming {
    *current = incoming.clone();
    changed.insert(field);
  }
}

/// Overwrite when the incoming value is present and different.
fn fill<T: PartialEq + Clone>(
  field: &'static str,
  current: &mut Option<T>,
  incoming: &Option<T>,
  changed: &mut BTreeSet<&'static str>,
) {
  if let Some(value) = incoming
    && current.as_ref() != Some(value)
  {
    *current = Some(value.clone());
    changed.insert(field);
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Merge an observed event into the stored one.
pub fn merge_event(existing: &Event, incoming: &Event) -> Merged<Event> {
  let mut merged = Merged::start(existing.clone());
  let out = &mut merged.record;

  match existing.state.advance(incoming.state) {
    Transition::Advanced(next) => {
      out.state = next;
      merged.changed.insert("state");
    }
    Transition::Rejected => merged.conflicts.push(MergeConflict::StateRegression {
      event_id: existing.event_id.clone(),
      existing: existing.state,
      incoming: incoming.state,
    }),
    Transition::Unchanged => {}
  }

  let flags = existing.artifacts.union(incoming.artifacts);
  if flags != existing.artifacts {
    out.artifacts = flags;
    merged.changed.insert("artifacts");
  }

  // Once final, everything below is frozen until an administrative reset.
  if existing.state != LifecycleState::Final {
    let changed = &mut merged.changed;
    replace("scheduled_at", &mut out.scheduled_at, &incoming.scheduled_at, changed);
    replace("game_date", &mut out.game_date, &incoming.game_date, changed);
    replace("home_team", &mut out.home_team, &incoming.home_team, changed);
    replace("away_team", &mut out.away_team, &incoming.away_team, changed);
    fill("score", &mut out.score, &incoming.score, changed);
    fill("status_detail", &mut out.status_detail, &incoming.status_detail, changed);
    fill("venue", &mut out.venue, &incoming.venue, changed);
    fill("last_fetched_at", &mut out.last_fetched_at, &incoming.last_fetched_at, changed);
  }

  merged
}

// ─── Roster ──────────────────────────────────────────────────────────────────

pub fn merge_team(existing: &Team, incoming: &Team) -> Merged<Team> {
  let mut merged = Merged::start(existing.clone());
  let (out, changed) = (&mut merged.record, &mut merged.changed);

  fill("display_name", &mut out.display_name, &incoming.display_name, changed);
  fill("short_name", &mut out.short_name, &incoming.short_name, changed);
  fill("abbreviation", &mut out.abbreviation, &incoming.abbreviation, changed);
  fill("location", &mut out.location, &incoming.location, changed);
  fill("nickname", &mut out.nickname, &incoming.nickname, changed);
  fill("conference", &mut out.conference, &incoming.conference, changed);
  fill("logo", &mut out.logo, &incoming.logo, changed);

  merged
}

pub fn merge_player(existing: &Player, incoming: &Player) -> Merged<Player> {
  let mut merged = Merged::start(existing.clone());
  let (out, changed) = (&mut merged.record, &mut merged.changed);

  fill("display_name", &mut out.display_name, &incoming.display_name, changed);
  fill("short_name", &mut out.short_name, &incoming.short_name, changed);
  fill("position", &mut out.position, &incoming.position, changed);
  fill("jersey", &mut out.jersey, &incoming.jersey, changed);
  fill("headshot", &mut out.headshot, &incoming.headshot, changed);
  fill("team_id", &mut out.team_id, &incoming.team_id, changed);
  fill("height", &mut out.height, &incoming.height, changed);
  fill("weight", &mut out.weight, &incoming.weight, changed);
  fill("class_year", &mut out.class_year, &incoming.class_year, changed);
  fill("profile_url", &mut out.profile_url, &incoming.profile_url, changed);
  fill("season", &mut out.season, &incoming.season, changed);

  merged
}
