//! A single game and everything the engine tracks about it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{artifact::ArtifactFlags, lifecycle::LifecycleState, roster::TeamId};

provider_id!(
  /// Provider-assigned game identifier. Stable for the lifetime of the game.
  EventId
);

/// Last observed score line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
  pub home: u32,
  pub away: u32,
}

/// The master record for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub event_id:        EventId,
  /// Scheduled tip-off. May move while the game is not final.
  pub scheduled_at:    DateTime<Utc>,
  /// Calendar date of the game in the reference time zone; the scope key.
  pub game_date:       NaiveDate,
  pub home_team:       TeamId,
  pub away_team:       TeamId,
  pub state:           LifecycleState,
  pub score:           Option<Score>,
  /// Free-text status from the provider, e.g. "Final/OT" or "2nd Half 4:12".
  pub status_detail:   Option<String>,
  pub venue:           Option<String>,
  pub last_fetched_at: Option<DateTime<Utc>>,
  pub artifacts:       ArtifactFlags,
}

impl Event {
  /// Whether the event needs no further work: terminal (or stale) with every
  /// required artifact durably captured. Stale events are left for manual
  /// review regardless of their artifacts.
  pub fn is_satisfied(&self, required: &[crate::artifact::ArtifactKind]) -> bool {
    match self.state {
      LifecycleState::Stale => true,
      LifecycleState::Final => self.artifacts.covers(required),
      _ => false,
    }
  }
}
