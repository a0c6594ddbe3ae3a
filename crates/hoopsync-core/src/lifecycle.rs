//! Event lifecycle: the state ordering and the classifier that maps provider
//! status vocabulary onto it.
//!
//! ```text
//! UNSEEN -> SCHEDULED -> LIVE -> FINAL      (main line, never moves backward)
//!        \___________\______\__-> STALE     (side branch, cleared by any
//!                                            later main-line observation)
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::ClassificationError;

// ─── States ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
  #[default]
  Unseen,
  Scheduled,
  Live,
  Final,
  /// No final observation arrived within the stale horizon; needs a human.
  Stale,
}

/// Result of folding an incoming state into an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  Unchanged,
  Advanced(LifecycleState),
  /// The incoming state would move the record backward.
  Rejected,
}

impl LifecycleState {
  /// Position on the main line; `None` for the stale side branch.
  pub fn rank(self) -> Option<u8> {
    match self {
      Self::Unseen => Some(0),
      Self::Scheduled => Some(1),
      Self::Live => Some(2),
      Self::Final => Some(3),
      Self::Stale => None,
    }
  }

  pub fn is_terminal(self) -> bool { matches!(self, Self::Final) }

  pub fn needs_fetch(self) -> bool { matches!(self, Self::Scheduled | Self::Live) }

  /// Fold `incoming` into `self` under the lifecycle ordering.
  pub fn advance(self, incoming: Self) -> Transition {
    use LifecycleState::*;
    match (self, incoming) {
      (current, next) if current == next => Transition::Unchanged,
      (Final, _) => Transition::Rejected,
      (_, Stale) => Transition::Advanced(Stale),
      (Stale, Unseen) => Transition::Rejected,
      (Stale, next) => Transition::Advanced(next),
      (current, next) if next.rank() > current.rank() => Transition::Advanced(next),
      _ => Transition::Rejected,
    }
  }

  /// The state after folding `incoming` in; rejected inputs leave it as is.
  pub fn resolve(self, incoming: Self) -> Self {
    match self.advance(incoming) {
      Transition::Advanced(next) => next,
      Transition::Unchanged | Transition::Rejected => self,
    }
  }
}

// ─── Observation ─────────────────────────────────────────────────────────────

/// What the provider reported about an event at one instant.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
  /// Provider status code or text, e.g. `"post"`, `"STATUS_FINAL"`, `"I"`.
  pub status:       &'a str,
  pub scheduled_at: Option<DateTime<Utc>>,
  /// When the observation was made, from the injected clock.
  pub observed_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
  pub state:               LifecycleState,
  pub needs_further_fetch: bool,
}

impl Classification {
  fn of(state: LifecycleState) -> Self {
    Self { state, needs_further_fetch: state.needs_fetch() }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  Pre,
  In,
  Post,
}

/// Map provider vocabulary onto a coarse game phase.
///
/// Understands ESPN state codes and status names, the NCAA single-letter
/// codes and the free-text forms both providers use in detail strings.
fn phase_of(status: &str) -> Option<Phase> {
  let lowered = status.trim().to_ascii_lowercase();
  let normalized = lowered.strip_prefix("status_").unwrap_or(&lowered);

  match normalized {
    "pre" | "p" | "scheduled" | "tbd" | "delayed" | "d" | "postponed"
    | "canceled" | "cancelled" | "suspended" | "forfeit_pending" => Some(Phase::Pre),
    "in" | "i" | "live" | "in_progress" | "in progress" | "halftime"
    | "end_period" | "end of period" | "overtime" => Some(Phase::In),
    "post" | "f" => Some(Phase::Post),
    other if other.starts_with("final") => Some(Phase::Post),
    _ => None,
  }
}

/// Whether the classifier understands `status` at all.
pub fn is_recognized(status: &str) -> bool { phase_of(status).is_some() }

// ─── Classifier ──────────────────────────────────────────────────────────────

/// Decides an event's next lifecycle state from a fresh observation.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
  /// How long after the scheduled start a non-final event turns stale.
  pub stale_horizon: TimeDelta,
}

impl Classifier {
  pub fn new(stale_horizon: TimeDelta) -> Self { Self { stale_horizon } }

  /// Classify `observation` given the event's `previous` state.
  ///
  /// A final event stays final without looking at the observation at all.
  /// Unknown vocabulary is an error and the caller keeps `previous`.
  pub fn classify(
    &self,
    previous: LifecycleState,
    observation: &Observation<'_>,
  ) -> Result<Classification, ClassificationError> {
    if previous.is_terminal() {
      return Ok(Classification::of(LifecycleState::Final));
    }

    let phase = phase_of(observation.status).ok_or_else(|| {
      ClassificationError::UnrecognizedStatus(observation.status.to_owned())
    })?;

    let started = observation
      .scheduled_at
      .is_some_and(|start| start <= observation.observed_at);

    let mut observed = match phase {
      Phase::Post => LifecycleState::Final,
      Phase::In => LifecycleState::Live,
      Phase::Pre if started => LifecycleState::Live,
      Phase::Pre => LifecycleState::Scheduled,
    };

    if observed != LifecycleState::Final
      && let Some(start) = observation.scheduled_at
      && observation.observed_at - start > self.stale_horizon
    {
      observed = LifecycleState::Stale;
    }

    Ok(Classification::of(previous.resolve(observed)))
  }
}
