//! Wire shapes of the ESPN site API, trimmed to the fields hoopsync reads.
//!
//! Identifiers and dates are required; a response without them fails to
//! deserialise and is reported as a schema mismatch. Everything else is
//! optional because the API omits fields freely, especially before tip-off.

use serde::Deserialize;

// ─── Shared ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireStatus {
  #[serde(rename = "type")]
  pub kind: WireStatusType,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireStatusType {
  /// e.g. `STATUS_FINAL`.
  pub name:         Option<String>,
  /// `pre`, `in` or `post`.
  pub state:        Option<String>,
  pub detail:       Option<String>,
  pub short_detail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTeam {
  pub id:                 String,
  #[serde(default)]
  pub uid:                Option<String>,
  #[serde(default)]
  pub location:           Option<String>,
  /// Mascot.
  #[serde(default)]
  pub name:               Option<String>,
  #[serde(default)]
  pub abbreviation:       Option<String>,
  #[serde(default)]
  pub display_name:       Option<String>,
  #[serde(default)]
  pub short_display_name: Option<String>,
  #[serde(default)]
  pub conference_id:      Option<String>,
  #[serde(default)]
  pub logo:               Option<String>,
  #[serde(default)]
  pub logos:              Vec<WireLink>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireLink {
  pub href: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCompetitor {
  #[serde(default)]
  pub uid:       Option<String>,
  /// `home` or `away`.
  pub home_away: String,
  #[serde(default)]
  pub score:     Option<String>,
  pub team:      WireTeam,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireVenue {
  pub full_name: Option<String>,
}

// ─── Scoreboard ──────────────────────────────────────────────────────────────

/// `GET {base}/{league}/scoreboard?dates=YYYYMMDD`
#[derive(Debug, Clone, Deserialize)]
pub struct Scoreboard {
  #[serde(default)]
  pub events: Vec<ScoreboardEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreboardEvent {
  pub id:           String,
  pub date:         String,
  #[serde(default)]
  pub status:       WireStatus,
  pub competitions: Vec<ScoreboardCompetition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreboardCompetition {
  pub competitors: Vec<WireCompetitor>,
  #[serde(default)]
  pub venue:       WireVenue,
  #[serde(default)]
  pub status:      Option<WireStatus>,
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// `GET {base}/{league}/summary?event={id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  pub header:    SummaryHeader,
  #[serde(default)]
  pub game_info: GameInfo,
  #[serde(default)]
  pub boxscore:  Boxscore,
  #[serde(default)]
  pub plays:     Vec<WirePlay>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryHeader {
  pub id:           String,
  pub competitions: Vec<SummaryCompetition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryCompetition {
  pub date:        String,
  #[serde(default)]
  pub status:      WireStatus,
  pub competitors: Vec<WireCompetitor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GameInfo {
  pub venue: WireVenue,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Boxscore {
  pub teams:   Vec<BoxscoreTeam>,
  pub players: Vec<BoxscorePlayers>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxscoreTeam {
  pub team:       WireTeam,
  #[serde(default)]
  pub home_away:  Option<String>,
  #[serde(default)]
  pub statistics: Vec<TeamStatistic>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamStatistic {
  pub name:          Option<String>,
  pub abbreviation:  Option<String>,
  pub label:         Option<String>,
  pub display_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoxscorePlayers {
  pub team:       WireTeam,
  #[serde(default)]
  pub statistics: Vec<PlayerStatGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerStatGroup {
  /// Internal stat keys, e.g. `fieldGoalsMade-fieldGoalsAttempted`.
  pub keys:     Vec<String>,
  /// Column labels, e.g. `FG`. Preferred over `keys` when present.
  pub labels:   Vec<String>,
  pub athletes: Vec<AthleteLine>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteLine {
  pub athlete:      WireAthlete,
  #[serde(default)]
  pub starter:      bool,
  #[serde(default)]
  pub did_not_play: bool,
  #[serde(default)]
  pub stats:        Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAthlete {
  pub id:           String,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub short_name:   Option<String>,
  #[serde(default)]
  pub jersey:       Option<String>,
  #[serde(default)]
  pub position:     Option<WirePosition>,
  #[serde(default)]
  pub headshot:     Option<WireLink>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WirePosition {
  pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePlay {
  pub id:              String,
  #[serde(default)]
  pub sequence_number: Option<String>,
  #[serde(default, rename = "type")]
  pub kind:            Option<WireText>,
  #[serde(default)]
  pub text:            Option<String>,
  #[serde(default)]
  pub period:          Option<WirePeriod>,
  #[serde(default)]
  pub clock:           Option<WireDisplay>,
  #[serde(default)]
  pub team:            Option<WireRef>,
  #[serde(default)]
  pub home_score:      Option<i64>,
  #[serde(default)]
  pub away_score:      Option<i64>,
  #[serde(default)]
  pub scoring_play:    bool,
  #[serde(default)]
  pub score_value:     Option<i64>,
  #[serde(default)]
  pub shooting_play:   bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireText {
  pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WirePeriod {
  pub number:        Option<u32>,
  pub display_value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireDisplay {
  pub display_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireRef {
  pub id: String,
}

// ─── Roster ──────────────────────────────────────────────────────────────────

/// `GET {base}/{league}/teams/{id}/roster?season=YYYY`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireRoster {
  pub athletes: Vec<RosterAthlete>,
  pub season:   Option<WireSeason>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireSeason {
  pub year: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterAthlete {
  pub id:             String,
  #[serde(default)]
  pub display_name:   Option<String>,
  #[serde(default)]
  pub short_name:     Option<String>,
  #[serde(default)]
  pub jersey:         Option<String>,
  #[serde(default)]
  pub position:       Option<WirePosition>,
  #[serde(default)]
  pub headshot:       Option<WireLink>,
  #[serde(default)]
  pub display_height: Option<String>,
  #[serde(default)]
  pub display_weight: Option<String>,
  #[serde(default)]
  pub experience:     Option<WireDisplay>,
  #[serde(default)]
  pub links:          Vec<WireRelLink>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireRelLink {
  pub href: Option<String>,
  /// e.g. `["playercard", "desktop", "athlete"]`.
  pub rel:  Vec<String>,
}
