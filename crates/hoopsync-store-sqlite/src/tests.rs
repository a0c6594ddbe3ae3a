//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, TimeZone as _, Utc};
use hoopsync_core::{
  MergeConflict,
  artifact::{ArtifactEntry, ArtifactFlags, ArtifactKind, ArtifactSet},
  event::{Event, EventId, Score},
  lifecycle::LifecycleState,
  merge::{MergeOutcome, Record, RecordKind},
  roster::{Player, PlayerId, Team, TeamId},
  store::{MasterStore, RunLog, RunMode, RunPhase, RunRecord, ScrapeLog},
};
use serde_json::json;
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 12, d).unwrap() }

fn game(id: &str, state: LifecycleState) -> Event {
  Event {
    event_id:        EventId::from(id),
    scheduled_at:    Utc.with_ymd_and_hms(2024, 12, 2, 0, 30, 0).unwrap(),
    game_date:       day(1),
    home_team:       TeamId::from("2"),
    away_team:       TeamId::from("8"),
    state,
    score:           None,
    status_detail:   None,
    venue:           None,
    last_fetched_at: None,
    artifacts:       ArtifactFlags::default(),
  }
}

fn plays(event_id: &str, count: u32) -> ArtifactSet {
  ArtifactSet {
    event_id: EventId::from(event_id),
    kind:     ArtifactKind::PlayByPlay,
    entries:  (1..=count)
      .map(|seq| ArtifactEntry {
        sub_key: seq.to_string(),
        data:    json!({ "sequence_number": seq, "type": "Jump Shot" }),
      })
      .collect(),
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_then_read_back_event() {
  let s = store().await;
  let mut e = game("401", LifecycleState::Live);
  e.score = Some(Score { home: 30, away: 28 });
  e.venue = Some("Neville Arena".into());
  e.last_fetched_at = Some(Utc.with_ymd_and_hms(2024, 12, 2, 1, 0, 0).unwrap());

  let report = s.merge(Record::Event(e.clone())).await.unwrap();
  assert_eq!(report.outcome, MergeOutcome::Inserted);

  let stored = s.get_event(&e.event_id).await.unwrap().unwrap();
  assert_eq!(stored, e);
  assert!(s.exists(RecordKind::Event, "401").await.unwrap());
  assert!(!s.exists(RecordKind::Event, "402").await.unwrap());
}

#[tokio::test]
async fn merging_the_same_event_twice_is_a_no_op() {
  let s = store().await;
  let e = game("401", LifecycleState::Scheduled);

  s.merge(Record::Event(e.clone())).await.unwrap();
  let again = s.merge(Record::Event(e.clone())).await.unwrap();

  assert!(again.is_no_op());
  assert!(again.conflicts.is_empty());
  assert_eq!(s.events_on(day(1)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn stale_observation_cannot_regress_state() {
  let s = store().await;
  s.merge(Record::Event(game("401", LifecycleState::Final)))
    .await
    .unwrap();

  let report = s
    .merge(Record::Event(game("401", LifecycleState::Live)))
    .await
    .unwrap();

  assert!(report.is_no_op());
  assert!(matches!(
    report.conflicts.as_slice(),
    [MergeConflict::StateRegression { existing: LifecycleState::Final, .. }]
  ));
  let stored = s.get_event(&EventId::from("401")).await.unwrap().unwrap();
  assert_eq!(stored.state, LifecycleState::Final);
}

#[tokio::test]
async fn events_on_filters_by_game_date() {
  let s = store().await;
  s.merge(Record::Event(game("401", LifecycleState::Scheduled)))
    .await
    .unwrap();
  let mut other = game("402", LifecycleState::Scheduled);
  other.game_date = day(2);
  s.merge(Record::Event(other)).await.unwrap();

  let first = s.events_on(day(1)).await.unwrap();
  assert_eq!(first.len(), 1);
  assert_eq!(first[0].event_id.as_str(), "401");
  assert!(s.events_on(day(3)).await.unwrap().is_empty());
}

#[tokio::test]
async fn reset_returns_final_event_to_unseen() {
  let s = store().await;
  s.merge(Record::Event(game("401", LifecycleState::Final)))
    .await
    .unwrap();
  s.merge(Record::Artifacts(plays("401", 2))).await.unwrap();

  assert!(s.reset_event(&EventId::from("401")).await.unwrap());
  assert!(!s.reset_event(&EventId::from("999")).await.unwrap());

  let stored = s.get_event(&EventId::from("401")).await.unwrap().unwrap();
  assert_eq!(stored.state, LifecycleState::Unseen);
  assert_eq!(stored.artifacts, ArtifactFlags::default());
  // Rows survive the reset.
  assert_eq!(
    s.artifacts(&stored.event_id, ArtifactKind::PlayByPlay)
      .await
      .unwrap()
      .len(),
    2
  );
}

// ─── Teams & players ─────────────────────────────────────────────────────────

#[tokio::test]
async fn team_refinement_keeps_known_fields() {
  let s = store().await;
  let mut first = Team::bare(TeamId::from("2"));
  first.display_name = Some("Auburn Tigers".into());
  first.abbreviation = Some("AUB".into());
  s.merge(Record::Team(first)).await.unwrap();

  let mut later = Team::bare(TeamId::from("2"));
  later.conference = Some("SEC".into());
  let report = s.merge(Record::Team(later)).await.unwrap();
  assert!(matches!(report.outcome, MergeOutcome::UpdatedFields(ref f) if f.contains("conference")));

  let team = s.get_team(&TeamId::from("2")).await.unwrap().unwrap();
  assert_eq!(team.display_name.as_deref(), Some("Auburn Tigers"));
  assert_eq!(team.abbreviation.as_deref(), Some("AUB"));
  assert_eq!(team.conference.as_deref(), Some("SEC"));
}

#[tokio::test]
async fn players_follow_their_latest_team() {
  let s = store().await;
  let mut p = Player::bare(PlayerId::from("5105"));
  p.display_name = Some("Johni Broome".into());
  p.team_id = Some(TeamId::from("2"));
  s.merge(Record::Player(p.clone())).await.unwrap();

  assert_eq!(s.players_of(&TeamId::from("2")).await.unwrap().len(), 1);

  p.team_id = Some(TeamId::from("8"));
  s.merge(Record::Player(p)).await.unwrap();

  assert!(s.players_of(&TeamId::from("2")).await.unwrap().is_empty());
  let stored = s.get_player(&PlayerId::from("5105")).await.unwrap().unwrap();
  assert_eq!(stored.team_id, Some(TeamId::from("8")));
  assert_eq!(stored.display_name.as_deref(), Some("Johni Broome"));
}

#[tokio::test]
async fn roster_fields_round_trip_and_survive_box_scores() {
  let s = store().await;
  let mut rostered = Player::bare(PlayerId::from("5105"));
  rostered.display_name = Some("Johni Broome".into());
  rostered.team_id = Some(TeamId::from("2"));
  rostered.height = Some("6' 10\"".into());
  rostered.weight = Some("240 lbs".into());
  rostered.class_year = Some("Senior".into());
  rostered.profile_url =
    Some("https://www.espn.com/mens-college-basketball/player/_/id/5105".into());
  rostered.season = Some(2025);
  s.merge(Record::Player(rostered.clone())).await.unwrap();
  assert_eq!(s.get_player(&PlayerId::from("5105")).await.unwrap(), Some(rostered.clone()));

  let mut boxed = Player::bare(PlayerId::from("5105"));
  boxed.jersey = Some("4".into());
  boxed.team_id = Some(TeamId::from("2"));
  s.merge(Record::Player(boxed)).await.unwrap();

  let stored = s.get_player(&PlayerId::from("5105")).await.unwrap().unwrap();
  assert_eq!(stored.jersey.as_deref(), Some("4"));
  assert_eq!(stored.height, rostered.height);
  assert_eq!(stored.season, Some(2025));
}

#[tokio::test]
async fn teams_are_listed_by_id() {
  let s = store().await;
  for id in ["8", "150", "2"] {
    s.merge(Record::Team(Team::bare(TeamId::from(id)))).await.unwrap();
  }
  let ids: Vec<String> = s.teams().await.unwrap().into_iter().map(|t| t.team_id.0).collect();
  assert_eq!(ids, ["150", "2", "8"]);
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn artifacts_for_unknown_event_are_rejected() {
  let s = store().await;
  let report = s.merge(Record::Artifacts(plays("404", 3))).await.unwrap();

  assert!(report.is_no_op());
  assert!(matches!(
    report.conflicts.as_slice(),
    [MergeConflict::OrphanArtifact { kind: ArtifactKind::PlayByPlay, .. }]
  ));
  assert!(!s.exists(RecordKind::Artifact, "404").await.unwrap());
}

#[tokio::test]
async fn live_artifacts_are_refreshed_but_not_captured() {
  let s = store().await;
  let id = EventId::from("401");
  s.merge(Record::Event(game("401", LifecycleState::Live)))
    .await
    .unwrap();

  let first = s.merge(Record::Artifacts(plays("401", 2))).await.unwrap();
  assert_eq!(first.outcome, MergeOutcome::Inserted);
  assert!(s.needs_artifact(&id, ArtifactKind::PlayByPlay).await.unwrap());

  let more = s.merge(Record::Artifacts(plays("401", 12))).await.unwrap();
  assert!(matches!(more.outcome, MergeOutcome::UpdatedFields(_)));
  assert!(s.needs_artifact(&id, ArtifactKind::PlayByPlay).await.unwrap());

  let rows = s.artifacts(&id, ArtifactKind::PlayByPlay).await.unwrap();
  let keys: Vec<_> = rows.iter().map(|r| r.sub_key.as_str()).collect();
  assert_eq!(keys.len(), 12);
  assert_eq!(keys[..3], ["1", "2", "3"]);
  assert_eq!(keys[11], "12");
}

#[tokio::test]
async fn final_artifacts_are_captured_once() {
  let s = store().await;
  let id = EventId::from("401");
  s.merge(Record::Event(game("401", LifecycleState::Final)))
    .await
    .unwrap();

  s.merge(Record::Artifacts(plays("401", 3))).await.unwrap();
  assert!(!s.needs_artifact(&id, ArtifactKind::PlayByPlay).await.unwrap());
  assert!(s.needs_artifact(&id, ArtifactKind::TeamStats).await.unwrap());

  let stored = s.get_event(&id).await.unwrap().unwrap();
  assert!(stored.artifacts.play_by_play);

  // A second capture of a frozen set changes nothing.
  let again = s.merge(Record::Artifacts(plays("401", 5))).await.unwrap();
  assert!(again.is_no_op());
  assert_eq!(s.artifacts(&id, ArtifactKind::PlayByPlay).await.unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_event_needs_every_artifact() {
  let s = store().await;
  for kind in ArtifactKind::all() {
    assert!(s.needs_artifact(&EventId::from("1"), kind).await.unwrap());
  }
}

#[tokio::test]
async fn summary_counts_everything() {
  let s = store().await;
  s.merge(Record::Event(game("401", LifecycleState::Final)))
    .await
    .unwrap();
  s.merge(Record::Event(game("402", LifecycleState::Scheduled)))
    .await
    .unwrap();
  s.merge(Record::Team(Team::bare(TeamId::from("2"))))
    .await
    .unwrap();
  s.merge(Record::Artifacts(plays("401", 4))).await.unwrap();

  let summary = s.summary().await.unwrap();
  assert_eq!(
    summary.events_by_state,
    vec![(LifecycleState::Final, 1), (LifecycleState::Scheduled, 1)]
  );
  assert_eq!(summary.teams, 1);
  assert_eq!(summary.players, 0);
  assert_eq!(summary.artifact_rows, 4);
}

// ─── Scrape log ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn scrape_log_round_trip() {
  let s = store().await;
  let scope = "mens-college-basketball";

  assert!(s.add(day(2), scope).await.unwrap());
  assert!(s.add(day(1), scope).await.unwrap());
  assert!(!s.add(day(1), scope).await.unwrap());

  assert!(s.contains(day(1), scope).await.unwrap());
  assert!(!s.contains(day(1), "womens-college-basketball").await.unwrap());
  assert_eq!(s.completed(scope).await.unwrap(), vec![day(1), day(2)]);

  assert!(s.remove(day(1), scope).await.unwrap());
  assert!(!s.remove(day(1), scope).await.unwrap());
  assert_eq!(s.completed(scope).await.unwrap(), vec![day(2)]);
}

#[tokio::test]
async fn roster_log_is_keyed_by_team_season_and_scope() {
  let s = store().await;
  let scope = "mens-college-basketball";
  let auburn = TeamId::from("2");

  assert!(!s.has_roster(&auburn, 2025, scope).await.unwrap());
  assert!(s.add_roster(&auburn, 2025, scope).await.unwrap());
  assert!(!s.add_roster(&auburn, 2025, scope).await.unwrap());

  assert!(s.has_roster(&auburn, 2025, scope).await.unwrap());
  assert!(!s.has_roster(&auburn, 2026, scope).await.unwrap());
  assert!(!s.has_roster(&TeamId::from("8"), 2025, scope).await.unwrap());
  assert!(!s.has_roster(&auburn, 2025, "womens-college-basketball").await.unwrap());

  assert!(s.remove_roster(&auburn, 2025, scope).await.unwrap());
  assert!(!s.has_roster(&auburn, 2025, scope).await.unwrap());
}

// ─── Run log ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn run_log_records_start_and_finish() {
  let s = store().await;
  let started = Utc.with_ymd_and_hms(2024, 12, 2, 12, 0, 0).unwrap();
  let mut run = RunRecord {
    run_id:      Uuid::new_v4(),
    mode:        RunMode::Backfill,
    started_at:  started,
    finished_at: None,
    phase:       RunPhase::Start,
    candidates:  0,
    fetched:     0,
    skipped:     0,
    failed:      0,
    conflicts:   0,
  };
  s.start_run(&run).await.unwrap();

  run.phase = RunPhase::PartiallyCompleted;
  run.finished_at = Some(started + chrono::TimeDelta::minutes(3));
  run.candidates = 14;
  run.fetched = 12;
  run.failed = 2;
  s.finish_run(&run).await.unwrap();

  let older = RunRecord {
    run_id: Uuid::new_v4(),
    started_at: started - chrono::TimeDelta::days(1),
    mode: RunMode::Live,
    ..run.clone()
  };
  s.start_run(&older).await.unwrap();

  let runs = s.recent_runs(10).await.unwrap();
  assert_eq!(runs.len(), 2);
  assert_eq!(runs[0], run);
  assert_eq!(runs[1].mode, RunMode::Live);
  assert_eq!(s.recent_runs(1).await.unwrap().len(), 1);
}
