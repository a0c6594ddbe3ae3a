//! Derived per-event artifacts: play-by-play, team box score lines and player
//! box score lines.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};

use crate::{event::EventId, roster::Player};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactKind {
  PlayByPlay,
  TeamStats,
  PlayerStats,
}

impl ArtifactKind {
  pub fn all() -> Vec<Self> { Self::iter().collect() }
}

/// Which artifact kinds have been durably captured for an event.
///
/// Flags only ever go from `false` to `true`; see [`ArtifactFlags::union`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFlags {
  pub play_by_play: bool,
  pub team_stats:   bool,
  pub player_stats: bool,
}

impl ArtifactFlags {
  pub fn get(&self, kind: ArtifactKind) -> bool {
    match kind {
      ArtifactKind::PlayByPlay => self.play_by_play,
      ArtifactKind::TeamStats => self.team_stats,
      ArtifactKind::PlayerStats => self.player_stats,
    }
  }

  pub fn set(&mut self, kind: ArtifactKind) {
    match kind {
      ArtifactKind::PlayByPlay => self.play_by_play = true,
      ArtifactKind::TeamStats => self.team_stats = true,
      ArtifactKind::PlayerStats => self.player_stats = true,
    }
  }

  pub fn union(self, other: Self) -> Self {
    Self {
      play_by_play: self.play_by_play || other.play_by_play,
      team_stats:   self.team_stats || other.team_stats,
      player_stats: self.player_stats || other.player_stats,
    }
  }

  /// True when every kind in `required` is captured.
  pub fn covers(&self, required: &[ArtifactKind]) -> bool {
    required.iter().all(|k| self.get(*k))
  }
}

/// One row of an artifact, identified within its event by `sub_key`
/// (play sequence number, team id or player id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
  pub sub_key: String,
  pub data:    serde_json::Value,
}

/// What the provider returns for one (event, kind) fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPayload {
  pub kind:    ArtifactKind,
  pub entries: Vec<ArtifactEntry>,
  /// Players discovered while building the rows, folded into the player
  /// collection alongside the artifact.
  pub players: Vec<Player>,
}

/// The rows of one artifact kind for one event, as handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSet {
  pub event_id: EventId,
  pub kind:     ArtifactKind,
  pub entries:  Vec<ArtifactEntry>,
}
