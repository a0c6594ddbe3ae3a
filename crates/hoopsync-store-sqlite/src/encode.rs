//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, enums
//! use their snake_case names and artifact rows are compact JSON.

use chrono::{DateTime, NaiveDate, Utc};
use hoopsync_core::{
  artifact::ArtifactFlags,
  event::{Event, EventId, Score},
  lifecycle::LifecycleState,
  roster::{Player, PlayerId, Team, TeamId},
  store::{RunMode, RunPhase, RunRecord},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_enum<T: std::str::FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

fn decode_score(home: Option<i64>, away: Option<i64>) -> Result<Option<Score>> {
  let (Some(home), Some(away)) = (home, away) else {
    return Ok(None);
  };
  let points = |v: i64| {
    u32::try_from(v)
      .map_err(|_| Error::UnknownValue { column: "score", value: v.to_string() })
  };
  Ok(Some(Score { home: points(home)?, away: points(away)? }))
}

// ─── Events ──────────────────────────────────────────────────────────────────

pub const EVENT_COLUMNS: &str = "event_id, scheduled_at, game_date, home_team_id, away_team_id,
   state, home_score, away_score, status_detail, venue, last_fetched_at,
   has_play_by_play, has_team_stats, has_player_stats";

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub event_id:         String,
  pub scheduled_at:     String,
  pub game_date:        String,
  pub home_team_id:     String,
  pub away_team_id:     String,
  pub state:            String,
  pub home_score:       Option<i64>,
  pub away_score:       Option<i64>,
  pub status_detail:    Option<String>,
  pub venue:            Option<String>,
  pub last_fetched_at:  Option<String>,
  pub has_play_by_play: bool,
  pub has_team_stats:   bool,
  pub has_player_stats: bool,
}

impl RawEvent {
  /// Map a row selected with [`EVENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:         row.get(0)?,
      scheduled_at:     row.get(1)?,
      game_date:        row.get(2)?,
      home_team_id:     row.get(3)?,
      away_team_id:     row.get(4)?,
      state:            row.get(5)?,
      home_score:       row.get(6)?,
      away_score:       row.get(7)?,
      status_detail:    row.get(8)?,
      venue:            row.get(9)?,
      last_fetched_at:  row.get(10)?,
      has_play_by_play: row.get(11)?,
      has_team_stats:   row.get(12)?,
      has_player_stats: row.get(13)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:        EventId(self.event_id),
      scheduled_at:    decode_dt(&self.scheduled_at)?,
      game_date:       decode_date(&self.game_date)?,
      home_team:       TeamId(self.home_team_id),
      away_team:       TeamId(self.away_team_id),
      state:           decode_enum("state", &self.state)?,
      score:           decode_score(self.home_score, self.away_score)?,
      status_detail:   self.status_detail,
      venue:           self.venue,
      last_fetched_at: self.last_fetched_at.as_deref().map(decode_dt).transpose()?,
      artifacts:       ArtifactFlags {
        play_by_play: self.has_play_by_play,
        team_stats:   self.has_team_stats,
        player_stats: self.has_player_stats,
      },
    })
  }
}

// ─── Roster ──────────────────────────────────────────────────────────────────

pub const TEAM_COLUMNS: &str =
  "team_id, display_name, short_name, abbreviation, location, nickname, conference, logo";

pub fn team_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Team> {
  Ok(Team {
    team_id:      TeamId(row.get(0)?),
    display_name: row.get(1)?,
    short_name:   row.get(2)?,
    abbreviation: row.get(3)?,
    location:     row.get(4)?,
    nickname:     row.get(5)?,
    conference:   row.get(6)?,
    logo:         row.get(7)?,
  })
}

pub const PLAYER_COLUMNS: &str = "player_id, display_name, short_name, position, jersey, headshot,
   team_id, height, weight, class_year, profile_url, season";

pub fn player_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
  Ok(Player {
    player_id:    PlayerId(row.get(0)?),
    display_name: row.get(1)?,
    short_name:   row.get(2)?,
    position:     row.get(3)?,
    jersey:       row.get(4)?,
    headshot:     row.get(5)?,
    team_id:      row.get::<_, Option<String>>(6)?.map(TeamId),
    height:       row.get(7)?,
    weight:       row.get(8)?,
    class_year:   row.get(9)?,
    profile_url:  row.get(10)?,
    season:       row.get(11)?,
  })
}

// ─── Runs ────────────────────────────────────────────────────────────────────

pub const RUN_COLUMNS: &str =
  "run_id, mode, started_at, finished_at, phase, candidates, fetched, skipped, failed, conflicts";

/// Raw values read directly from a `sync_runs` row.
pub struct RawRun {
  pub run_id:      String,
  pub mode:        String,
  pub started_at:  String,
  pub finished_at: Option<String>,
  pub phase:       String,
  pub counters:    [i64; 5],
}

impl RawRun {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      run_id:      row.get(0)?,
      mode:        row.get(1)?,
      started_at:  row.get(2)?,
      finished_at: row.get(3)?,
      phase:       row.get(4)?,
      counters:    [row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?],
    })
  }

  pub fn into_run(self) -> Result<RunRecord> {
    let [candidates, fetched, skipped, failed, conflicts] =
      self.counters.map(|n| n.max(0) as u64);
    Ok(RunRecord {
      run_id: Uuid::parse_str(&self.run_id)?,
      mode: decode_enum::<RunMode>("mode", &self.mode)?,
      started_at: decode_dt(&self.started_at)?,
      finished_at: self.finished_at.as_deref().map(decode_dt).transpose()?,
      phase: decode_enum::<RunPhase>("phase", &self.phase)?,
      candidates,
      fetched,
      skipped,
      failed,
      conflicts,
    })
  }
}

pub fn decode_state(s: &str) -> Result<LifecycleState> { decode_enum("state", s) }
