use std::time::Duration;

use chrono::{TimeZone, Utc};
use hoopsync_core::{
  FetchError,
  artifact::ArtifactKind,
  event::Score,
  roster::{PlayerId, TeamId},
};
use reqwest::{StatusCode, header::HeaderValue};
use serde_json::{Value, json};

use crate::{
  config::EspnConfig,
  model::{Scoreboard, Summary, WireRoster},
  parse::{self, decode},
  provider::status_error,
};

const SCOREBOARD: &str = include_str!("../fixtures/scoreboard.json");
const SUMMARY: &str = include_str!("../fixtures/summary.json");
const ROSTER: &str = include_str!("../fixtures/roster.json");

fn scoreboard() -> Scoreboard { decode(SCOREBOARD.as_bytes(), "scoreboard").unwrap() }

fn summary() -> Summary { decode(SUMMARY.as_bytes(), "summary").unwrap() }

fn summary_with(edit: impl FnOnce(&mut Value)) -> Result<Summary, FetchError> {
  let mut value: Value = serde_json::from_str(SUMMARY).unwrap();
  edit(&mut value);
  decode(value.to_string().as_bytes(), "summary")
}

fn keys(payload: &hoopsync_core::artifact::ArtifactPayload) -> Vec<&str> {
  payload.entries.iter().map(|e| e.sub_key.as_str()).collect()
}

// ─── Decoding helpers ────────────────────────────────────────────────────────

#[test]
fn dates_with_and_without_seconds_parse() {
  let expected = Utc.with_ymd_and_hms(2024, 12, 1, 17, 0, 0).unwrap();
  assert_eq!(parse::parse_datetime("2024-12-01T17:00Z"), Some(expected));
  assert_eq!(parse::parse_datetime("2024-12-01T17:00:00Z"), Some(expected));
  assert_eq!(parse::parse_datetime("2024-12-01T12:00:00-05:00"), Some(expected));
  assert_eq!(parse::parse_datetime("December 1st"), None);
}

#[test]
fn team_ids_come_from_the_uid_segment() {
  assert_eq!(parse::team_id_from_uid("s:40~l:41~t:2"), Some("2"));
  assert_eq!(parse::team_id_from_uid("s:40~t:2305~l:41"), Some("2305"));
  assert_eq!(parse::team_id_from_uid("s:40~l:41"), None);
  assert_eq!(parse::team_id_from_uid("s:40~l:41~t:"), None);
}

#[test]
fn non_json_is_malformed() {
  let got = decode::<Scoreboard>(b"<html>502 Bad Gateway</html>", "scoreboard");
  assert!(matches!(got, Err(FetchError::Malformed(_))), "{got:?}");
}

#[test]
fn json_missing_required_fields_is_a_schema_mismatch() {
  let got = summary_with(|v| {
    v.as_object_mut().unwrap().remove("header");
  });
  assert!(matches!(got, Err(FetchError::SchemaMismatch(_))), "{got:?}");
}

// ─── Schedule ────────────────────────────────────────────────────────────────

#[test]
fn scoreboard_yields_one_stub_per_event() {
  let stubs = parse::schedule_from(scoreboard()).unwrap();
  assert_eq!(stubs.len(), 2);

  let first = &stubs[0];
  assert_eq!(first.event_id.as_str(), "401700001");
  assert_eq!(first.scheduled_at, Utc.with_ymd_and_hms(2024, 12, 1, 17, 0, 0).unwrap());
  assert_eq!(first.home.team_id, TeamId::from("2"));
  assert_eq!(first.home.nickname.as_deref(), Some("Tigers"));
  assert_eq!(first.home.conference.as_deref(), Some("23"));
  assert_eq!(first.away.team_id, TeamId::from("150"));
  assert_eq!(first.status.code, "STATUS_FINAL");
  assert_eq!(first.status.detail.as_deref(), Some("Final"));
}

#[test]
fn scoreboard_falls_back_to_competition_status_and_plain_ids() {
  let stubs = parse::schedule_from(scoreboard()).unwrap();
  let second = &stubs[1];

  assert_eq!(second.status.code, "STATUS_SCHEDULED");
  // Competitors listed away-first are still assigned by `homeAway`.
  assert_eq!(second.home.team_id, TeamId::from("12"));
  assert_eq!(second.away.team_id, TeamId::from("2305"));
  assert_eq!(
    second.home.logo.as_deref(),
    Some("https://a.espncdn.com/i/teamlogos/ncaa/500/12.png")
  );
}

#[test]
fn an_empty_scoreboard_is_an_empty_schedule() {
  let board: Scoreboard = decode(br#"{"leagues": []}"#, "scoreboard").unwrap();
  assert!(parse::schedule_from(board).unwrap().is_empty());
}

#[test]
fn an_event_without_a_home_side_is_a_schema_mismatch() {
  let board: Scoreboard = decode(
    json!({
      "events": [{
        "id": "9",
        "date": "2024-12-01T17:00Z",
        "competitions": [{
          "competitors": [{ "homeAway": "away", "team": { "id": "1" } }]
        }]
      }]
    })
    .to_string()
    .as_bytes(),
    "scoreboard",
  )
  .unwrap();

  let got = parse::schedule_from(board);
  assert!(matches!(got, Err(FetchError::SchemaMismatch(_))), "{got:?}");
}

// ─── Detail ──────────────────────────────────────────────────────────────────

#[test]
fn summary_header_becomes_event_detail() {
  let detail = parse::detail_from(&summary()).unwrap();

  assert_eq!(detail.event_id.as_str(), "401700001");
  assert_eq!(detail.home.team_id, TeamId::from("2"));
  assert_eq!(detail.away.team_id, TeamId::from("150"));
  assert_eq!(detail.score, Some(Score { home: 75, away: 70 }));
  assert_eq!(detail.status.code, "STATUS_FINAL");
  assert_eq!(detail.status.detail.as_deref(), Some("Final/OT"));
  assert_eq!(detail.venue.as_deref(), Some("Neville Arena"));
}

#[test]
fn pregame_detail_has_no_score() {
  let summary = summary_with(|v| {
    v["header"]["competitions"][0]["status"]["type"] =
      json!({ "name": "STATUS_SCHEDULED", "state": "pre" });
  })
  .unwrap();

  let detail = parse::detail_from(&summary).unwrap();
  assert_eq!(detail.score, None);
  assert_eq!(detail.status.detail, None);
}

#[test]
fn unknown_status_names_yield_to_the_state() {
  let summary = summary_with(|v| {
    v["header"]["competitions"][0]["status"]["type"] =
      json!({ "name": "STATUS_FORFEIT", "state": "post", "detail": "Forfeit" });
  })
  .unwrap();
  assert_eq!(parse::detail_from(&summary).unwrap().status.code, "post");

  // A known name still wins over a misleading state.
  let summary = summary_with(|v| {
    v["header"]["competitions"][0]["status"]["type"] =
      json!({ "name": "STATUS_POSTPONED", "state": "post" });
  })
  .unwrap();
  assert_eq!(parse::detail_from(&summary).unwrap().status.code, "STATUS_POSTPONED");
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

#[test]
fn plays_are_keyed_by_sequence_number() {
  let payload = parse::artifact_from(&summary(), ArtifactKind::PlayByPlay);

  assert_eq!(payload.kind, ArtifactKind::PlayByPlay);
  // The last play has no sequence number and falls back to its id.
  assert_eq!(keys(&payload), ["1", "2", "4017000019"]);
  assert!(payload.players.is_empty());

  let jumper = &payload.entries[1].data;
  assert_eq!(jumper["type"], "JumpShot");
  assert_eq!(jumper["team_id"], "150");
  assert_eq!(jumper["away_score"], 2);
  assert_eq!(jumper["scoring_play"], true);
  assert_eq!(jumper["clock"], "19:41");
  assert_eq!(jumper["period"], 1);
}

#[test]
fn team_stats_are_keyed_by_team() {
  let payload = parse::artifact_from(&summary(), ArtifactKind::TeamStats);

  assert_eq!(keys(&payload), ["150", "2"]);
  let duke = &payload.entries[0].data;
  assert_eq!(duke["home_away"], "away");
  assert_eq!(duke["fieldGoalsMade-fieldGoalsAttempted"], "26-61");
  // No `name`, so the abbreviation is the column.
  assert_eq!(duke["REB"], "33");
}

#[test]
fn player_stats_are_keyed_by_player_and_discover_players() {
  let payload = parse::artifact_from(&summary(), ArtifactKind::PlayerStats);

  assert_eq!(keys(&payload), ["5041939", "5105555", "4433225"]);

  let flagg = &payload.entries[0].data;
  assert_eq!(flagg["PTS"], "24");
  assert_eq!(flagg["starter"], true);
  assert_eq!(flagg["team_id"], "150");
  assert_eq!(payload.entries[1].data["did_not_play"], true);
  // Without labels the internal keys name the columns.
  assert_eq!(payload.entries[2].data["points"], "21");

  assert_eq!(payload.players.len(), 3);
  let flagg = &payload.players[0];
  assert_eq!(flagg.display_name.as_deref(), Some("Cooper Flagg"));
  assert_eq!(flagg.position.as_deref(), Some("F"));
  assert_eq!(flagg.jersey.as_deref(), Some("2"));
  assert_eq!(flagg.team_id, Some(TeamId::from("150")));
  assert_eq!(payload.players[2].team_id, Some(TeamId::from("2")));
}

#[test]
fn a_summary_without_a_boxscore_has_empty_artifacts() {
  let summary = summary_with(|v| {
    let root = v.as_object_mut().unwrap();
    root.remove("boxscore");
    root.remove("plays");
  })
  .unwrap();

  for kind in ArtifactKind::all() {
    let payload = parse::artifact_from(&summary, kind);
    assert!(payload.entries.is_empty(), "{kind}");
    assert!(payload.players.is_empty(), "{kind}");
  }
}

// ─── HTTP mapping ────────────────────────────────────────────────────────────

// ─── Roster ──────────────────────────────────────────────────────────────────

fn roster() -> WireRoster { decode(ROSTER.as_bytes(), "roster").unwrap() }

#[test]
fn roster_lists_players_with_their_biography() {
  let team = TeamId::from("2");
  let roster = parse::roster_from(&team, 2025, roster());
  assert_eq!(roster.team_id, team);
  assert_eq!(roster.season, 2025);
  let ids: Vec<_> = roster.players.iter().map(|p| p.player_id.as_str()).collect();
  assert_eq!(ids, ["4433176", "5105566", "5174871"]);

  let broome = &roster.players[0];
  assert_eq!(broome.player_id, PlayerId::from("4433176"));
  assert_eq!(broome.display_name.as_deref(), Some("Johni Broome"));
  assert_eq!(broome.position.as_deref(), Some("F"));
  assert_eq!(broome.height.as_deref(), Some("6' 10\""));
  assert_eq!(broome.weight.as_deref(), Some("240 lbs"));
  assert_eq!(broome.class_year.as_deref(), Some("Senior"));
  assert_eq!(
    broome.profile_url.as_deref(),
    Some("https://www.espn.com/mens-college-basketball/player/_/id/4433176/johni-broome")
  );
  assert!(roster.players.iter().all(|p| p.team_id.as_ref() == Some(&team)));
  assert!(roster.players.iter().all(|p| p.season == Some(2025)));
}

#[test]
fn roster_links_fall_back_to_the_first_one() {
  let roster = parse::roster_from(&TeamId::from("2"), 2025, roster());
  let pettiford = &roster.players[1];
  assert_eq!(
    pettiford.profile_url.as_deref(),
    Some("https://www.espn.com/mens-college-basketball/player/stats/_/id/5105566/tahaad-pettiford")
  );
  let walk_on = &roster.players[2];
  assert_eq!(walk_on.profile_url, None);
  assert_eq!(walk_on.class_year, None);
}

#[test]
fn echoed_season_wins_over_the_requested_one() {
  let requested = parse::roster_from(&TeamId::from("2"), 2031, roster());
  assert_eq!(requested.season, 2025);

  let silent: WireRoster = decode(br#"{"athletes": []}"#, "roster").unwrap();
  let roster = parse::roster_from(&TeamId::from("2"), 2031, silent);
  assert_eq!(roster.season, 2031);
  assert!(roster.players.is_empty());
}

#[test]
fn rate_limits_carry_the_retry_after_hint() {
  let header = HeaderValue::from_static("7");
  assert_eq!(
    status_error(StatusCode::TOO_MANY_REQUESTS, Some(&header), "scoreboard"),
    FetchError::RateLimited { retry_after: Some(Duration::from_secs(7)) }
  );

  // HTTP-date hints are not honoured.
  let header = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
  assert_eq!(
    status_error(StatusCode::TOO_MANY_REQUESTS, Some(&header), "scoreboard"),
    FetchError::RateLimited { retry_after: None }
  );
}

#[test]
fn other_statuses_map_onto_the_fetch_taxonomy() {
  assert_eq!(
    status_error(StatusCode::NOT_FOUND, None, "summary for event 1"),
    FetchError::NotFound("summary for event 1".into())
  );
  assert_eq!(status_error(StatusCode::BAD_GATEWAY, None, "x"), FetchError::Server(502));
  assert_eq!(status_error(StatusCode::FORBIDDEN, None, "x"), FetchError::Client(403));
  assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, None, "x").is_transient());
}

#[test]
fn endpoints_join_base_and_league() {
  let config = EspnConfig {
    base_url: "https://example.test/sports/basketball/".into(),
    ..EspnConfig::default()
  };
  assert_eq!(
    config.endpoint("scoreboard"),
    "https://example.test/sports/basketball/mens-college-basketball/scoreboard"
  );
  assert_eq!(
    config.endpoint("teams/2/roster"),
    "https://example.test/sports/basketball/mens-college-basketball/teams/2/roster"
  );
}
