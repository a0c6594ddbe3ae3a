//! Conversion from ESPN wire shapes into hoopsync's domain types.
//!
//! Everything here is pure; the HTTP side lives in [`crate::provider`].

use chrono::{DateTime, NaiveDateTime, Utc};
use hoopsync_core::{
  FetchError,
  artifact::{ArtifactEntry, ArtifactKind, ArtifactPayload},
  event::{EventId, Score},
  lifecycle,
  provider::{EventDetail, EventStub, StatusSignal},
  roster::{Player, PlayerId, Roster, Team, TeamId},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::model::{
  Boxscore, Scoreboard, Summary, WireCompetitor, WirePlay, WireRelLink, WireRoster, WireStatus,
  WireTeam,
};

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Decode a response body. Bytes that are not JSON are `Malformed`; JSON
/// that lacks the fields we need is a `SchemaMismatch`.
pub fn decode<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T, FetchError> {
  let value: Value = serde_json::from_slice(body)
    .map_err(|e| FetchError::Malformed(format!("{what}: {e}")))?;
  serde_json::from_value(value).map_err(|e| FetchError::SchemaMismatch(format!("{what}: {e}")))
}

/// ESPN sends `2024-12-01T17:00Z` (no seconds) as often as full RFC 3339.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
    .ok()
    .map(|dt| dt.and_utc())
}

/// The `t:` segment of a uid like `s:40~l:41~t:2`.
pub fn team_id_from_uid(uid: &str) -> Option<&str> {
  uid
    .split('~')
    .find_map(|segment| segment.strip_prefix("t:"))
    .filter(|id| !id.is_empty())
}

// ─── Schedule ────────────────────────────────────────────────────────────────

pub fn schedule_from(board: Scoreboard) -> Result<Vec<EventStub>, FetchError> {
  board
    .events
    .into_iter()
    .map(|event| {
      let scheduled_at = required_datetime(&event.date, &event.id)?;
      let competition = event
        .competitions
        .first()
        .ok_or_else(|| mismatch(&event.id, "no competitions"))?;
      let (home, away) = split_competitors(&competition.competitors, &event.id)?;

      // The event-level status is the canonical one; fall back to the
      // competition's copy when the API leaves it empty.
      let status = match &competition.status {
        Some(inner) if status_is_empty(&event.status) => status_from(inner),
        _ => status_from(&event.status),
      };

      Ok(EventStub {
        event_id: EventId::new(event.id),
        scheduled_at,
        home: team_from(home),
        away: team_from(away),
        status,
      })
    })
    .collect()
}

// ─── Detail ──────────────────────────────────────────────────────────────────

pub fn detail_from(summary: &Summary) -> Result<EventDetail, FetchError> {
  let id = &summary.header.id;
  let competition = summary
    .header
    .competitions
    .first()
    .ok_or_else(|| mismatch(id, "no competitions"))?;
  let scheduled_at = required_datetime(&competition.date, id)?;
  let (home, away) = split_competitors(&competition.competitors, id)?;

  let score = if competition.status.kind.state.as_deref() == Some("pre") {
    None
  } else {
    score_of(home).zip(score_of(away)).map(|(home, away)| Score { home, away })
  };

  Ok(EventDetail {
    event_id: EventId::new(id.clone()),
    scheduled_at,
    home: team_from(home),
    away: team_from(away),
    status: status_from(&competition.status),
    score,
    venue: summary.game_info.venue.full_name.clone(),
  })
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

pub fn artifact_from(summary: &Summary, kind: ArtifactKind) -> ArtifactPayload {
  let (entries, players) = match kind {
    ArtifactKind::PlayByPlay => (play_by_play(&summary.plays), Vec::new()),
    ArtifactKind::TeamStats => (team_stats(&summary.boxscore), Vec::new()),
    ArtifactKind::PlayerStats => player_stats(&summary.boxscore),
  };
  ArtifactPayload { kind, entries, players }
}

fn play_by_play(plays: &[WirePlay]) -> Vec<ArtifactEntry> {
  plays
    .iter()
    .map(|play| {
      let sub_key = play
        .sequence_number
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| play.id.clone());
      let data = json!({
        "play_id":        play.id,
        "type":           play.kind.as_ref().and_then(|k| k.text.clone()),
        "text":           play.text,
        "period":         play.period.as_ref().and_then(|p| p.number),
        "period_display": play.period.as_ref().and_then(|p| p.display_value.clone()),
        "clock":          play.clock.as_ref().and_then(|c| c.display_value.clone()),
        "team_id":        play.team.as_ref().map(|t| t.id.clone()),
        "home_score":     play.home_score,
        "away_score":     play.away_score,
        "scoring_play":   play.scoring_play,
        "score_value":    play.score_value,
        "shooting_play":  play.shooting_play,
      });
      ArtifactEntry { sub_key, data }
    })
    .collect()
}

fn team_stats(boxscore: &Boxscore) -> Vec<ArtifactEntry> {
  boxscore
    .teams
    .iter()
    .map(|line| {
      let mut row = Map::new();
      row.insert("home_away".into(), json!(line.home_away));
      for stat in &line.statistics {
        let key = stat.name.as_ref().or(stat.abbreviation.as_ref()).or(stat.label.as_ref());
        if let Some(key) = key {
          row.insert(key.clone(), json!(stat.display_value));
        }
      }
      ArtifactEntry { sub_key: team_id(&line.team, None).0, data: Value::Object(row) }
    })
    .collect()
}

fn player_stats(boxscore: &Boxscore) -> (Vec<ArtifactEntry>, Vec<Player>) {
  let mut entries: Vec<ArtifactEntry> = Vec::new();
  let mut players: Vec<Player> = Vec::new();

  for side in &boxscore.players {
    let team = team_id(&side.team, None);
    for group in &side.statistics {
      let labels = if group.labels.is_empty() { &group.keys } else { &group.labels };

      for line in &group.athletes {
        let athlete = &line.athlete;

        let mut row = Map::new();
        row.insert("team_id".into(), json!(team.0));
        row.insert("starter".into(), json!(line.starter));
        row.insert("did_not_play".into(), json!(line.did_not_play));
        for (label, value) in labels.iter().zip(&line.stats) {
          row.insert(label.clone(), json!(value));
        }

        // A player listed in several stat groups ends up as one row.
        match entries.iter_mut().find(|e| e.sub_key == athlete.id) {
          Some(ArtifactEntry { data: Value::Object(existing), .. }) => existing.extend(row),
          _ => entries.push(ArtifactEntry { sub_key: athlete.id.clone(), data: Value::Object(row) }),
        }

        if !players.iter().any(|p| p.player_id.as_str() == athlete.id) {
          players.push(Player {
            display_name: athlete.display_name.clone(),
            short_name: athlete.short_name.clone(),
            position: athlete.position.as_ref().and_then(|p| p.abbreviation.clone()),
            jersey: athlete.jersey.clone(),
            headshot: athlete.headshot.as_ref().and_then(|h| h.href.clone()),
            team_id: Some(team.clone()),
            ..Player::bare(PlayerId::new(athlete.id.clone()))
          });
        }
      }
    }
  }

  (entries, players)
}

// ─── Rosters ─────────────────────────────────────────────────────────────────

/// The players listed on a team's roster page. The season echoed by the
/// response wins over the one requested, which ESPN may round to the
/// current season.
pub fn roster_from(team_id: &TeamId, season: i32, wire: WireRoster) -> Roster {
  let season = wire.season.and_then(|s| s.year).unwrap_or(season);
  let players = wire
    .athletes
    .into_iter()
    .map(|a| Player {
      display_name: a.display_name,
      short_name: a.short_name,
      position: a.position.and_then(|p| p.abbreviation),
      jersey: a.jersey,
      headshot: a.headshot.and_then(|h| h.href),
      team_id: Some(team_id.clone()),
      height: a.display_height,
      weight: a.display_weight,
      class_year: a.experience.and_then(|e| e.display_value),
      profile_url: profile_url(&a.links),
      season: Some(season),
      ..Player::bare(PlayerId::new(a.id))
    })
    .collect();
  Roster { team_id: team_id.clone(), season, players }
}

fn profile_url(links: &[WireRelLink]) -> Option<String> {
  links
    .iter()
    .find(|l| l.rel.iter().any(|r| r == "playercard"))
    .or(links.first())
    .and_then(|l| l.href.clone())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn mismatch(event_id: &str, what: &str) -> FetchError {
  FetchError::SchemaMismatch(format!("event {event_id}: {what}"))
}

fn required_datetime(raw: &str, event_id: &str) -> Result<DateTime<Utc>, FetchError> {
  parse_datetime(raw).ok_or_else(|| mismatch(event_id, &format!("unparseable date {raw:?}")))
}

fn split_competitors<'a>(
  competitors: &'a [WireCompetitor],
  event_id: &str,
) -> Result<(&'a WireCompetitor, &'a WireCompetitor), FetchError> {
  let side = |which: &str| {
    competitors
      .iter()
      .find(|c| c.home_away.eq_ignore_ascii_case(which))
      .ok_or_else(|| mismatch(event_id, &format!("no {which} competitor")))
  };
  Ok((side("home")?, side("away")?))
}

fn team_id(team: &WireTeam, competitor_uid: Option<&str>) -> TeamId {
  let from_uid = team
    .uid
    .as_deref()
    .and_then(team_id_from_uid)
    .or_else(|| competitor_uid.and_then(team_id_from_uid));
  TeamId::new(from_uid.unwrap_or(&team.id))
}

fn team_from(competitor: &WireCompetitor) -> Team {
  let team = &competitor.team;
  Team {
    team_id:      team_id(team, competitor.uid.as_deref()),
    display_name: team.display_name.clone(),
    short_name:   team.short_display_name.clone(),
    abbreviation: team.abbreviation.clone(),
    location:     team.location.clone(),
    nickname:     team.name.clone(),
    conference:   team.conference_id.clone(),
    logo:         team
      .logo
      .clone()
      .or_else(|| team.logos.iter().find_map(|l| l.href.clone())),
  }
}

fn status_is_empty(status: &WireStatus) -> bool {
  status.kind.name.is_none() && status.kind.state.is_none()
}

/// Prefer the precise name (`STATUS_POSTPONED`) over the coarse state, which
/// reports postponed games as `post`. A name the classifier does not know
/// (`STATUS_FORFEIT`) yields to a state it does.
fn status_from(status: &WireStatus) -> StatusSignal {
  let kind = &status.kind;
  let known = |code: &Option<String>| code.as_deref().is_some_and(lifecycle::is_recognized);
  let code = if known(&kind.name) || !known(&kind.state) {
    kind.name.clone().or_else(|| kind.state.clone())
  } else {
    kind.state.clone()
  };
  StatusSignal {
    code:   code.unwrap_or_default(),
    detail: kind.detail.clone().or_else(|| kind.short_detail.clone()),
  }
}

fn score_of(competitor: &WireCompetitor) -> Option<u32> {
  competitor.score.as_deref().and_then(|s| s.trim().parse().ok())
}
