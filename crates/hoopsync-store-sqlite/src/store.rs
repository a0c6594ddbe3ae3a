//! [`SqliteStore`]: the SQLite implementation of [`MasterStore`],
//! [`ScrapeLog`] and [`RunLog`].

use std::{collections::HashMap, path::Path};

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension as _;

use hoopsync_core::{
  MergeConflict,
  artifact::{ArtifactEntry, ArtifactKind, ArtifactSet},
  event::{Event, EventId},
  lifecycle::LifecycleState,
  merge::{MergeReport, Record, RecordKind, merge_event, merge_player, merge_team},
  roster::{Player, PlayerId, Team, TeamId},
  store::{MasterStore, RunLog, RunRecord, ScrapeLog, StoreSummary},
};

use crate::{
  Error, Result,
  encode::{
    EVENT_COLUMNS, PLAYER_COLUMNS, RUN_COLUMNS, RawEvent, RawRun, TEAM_COLUMNS, decode_date,
    decode_state, encode_date, encode_dt, player_from_row, team_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A hoopsync store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn merge_event_record(&self, incoming: Event) -> Result<MergeReport> {
    let now = encode_dt(Utc::now());

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing = select_event(&tx, incoming.event_id.as_str())?
          .map(RawEvent::into_event)
          .transpose()
          .map_err(Error::into_call_error)?;

        let report = match existing {
          None => {
            upsert_event(&tx, &incoming, &now)?;
            MergeReport::inserted()
          }
          Some(existing) => {
            let merged = merge_event(&existing, &incoming);
            if !merged.changed.is_empty() {
              upsert_event(&tx, &merged.record, &now)?;
            }
            MergeReport::from_changes(merged.changed, merged.conflicts)
          }
        };

        tx.commit()?;
        Ok(report)
      })
      .await?;

    Ok(report)
  }

  async fn merge_team_record(&self, incoming: Team) -> Result<MergeReport> {
    let now = encode_dt(Utc::now());

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing = tx
          .query_row(
            &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE team_id = ?1"),
            rusqlite::params![incoming.team_id.as_str()],
            team_from_row,
          )
          .optional()?;

        let report = match existing {
          None => {
            upsert_team(&tx, &incoming, &now)?;
            MergeReport::inserted()
          }
          Some(existing) => {
            let merged = merge_team(&existing, &incoming);
            if !merged.changed.is_empty() {
              upsert_team(&tx, &merged.record, &now)?;
            }
            MergeReport::from_changes(merged.changed, merged.conflicts)
          }
        };

        tx.commit()?;
        Ok(report)
      })
      .await?;

    Ok(report)
  }

  async fn merge_player_record(&self, incoming: Player) -> Result<MergeReport> {
    let now = encode_dt(Utc::now());

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing = tx
          .query_row(
            &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE player_id = ?1"),
            rusqlite::params![incoming.player_id.as_str()],
            player_from_row,
          )
          .optional()?;

        let report = match existing {
          None => {
            upsert_player(&tx, &incoming, &now)?;
            MergeReport::inserted()
          }
          Some(existing) => {
            let merged = merge_player(&existing, &incoming);
            if !merged.changed.is_empty() {
              upsert_player(&tx, &merged.record, &now)?;
            }
            MergeReport::from_changes(merged.changed, merged.conflicts)
          }
        };

        tx.commit()?;
        Ok(report)
      })
      .await?;

    Ok(report)
  }

  /// Artifact rows are upserted by sub-key and never removed. Once the
  /// owning event is final the set is marked captured and frozen; rows that
  /// arrive while the game is still running are overwritten on every run.
  async fn merge_artifact_set(&self, set: ArtifactSet) -> Result<MergeReport> {
    let now = encode_dt(Utc::now());

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(raw) = select_event(&tx, set.event_id.as_str())? else {
          return Ok(MergeReport::conflict(MergeConflict::OrphanArtifact {
            event_id: set.event_id,
            kind:     set.kind,
          }));
        };
        let event = raw.into_event().map_err(Error::into_call_error)?;

        if event.artifacts.get(set.kind) {
          return Ok(MergeReport::no_op());
        }

        let kind = set.kind.as_ref();
        let stored: HashMap<String, String> = {
          let mut stmt = tx.prepare(
            "SELECT sub_key, data_json FROM artifacts WHERE event_id = ?1 AND kind = ?2",
          )?;
          stmt
            .query_map(rusqlite::params![set.event_id.as_str(), kind], |row| {
              Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<_>>()?
        };

        let mut changed = std::collections::BTreeSet::new();
        for entry in &set.entries {
          let data = entry.data.to_string();
          if stored.get(&entry.sub_key) == Some(&data) {
            continue;
          }
          tx.execute(
            "INSERT INTO artifacts (event_id, kind, sub_key, data_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (event_id, kind, sub_key) DO UPDATE SET
               data_json  = excluded.data_json,
               updated_at = excluded.updated_at",
            rusqlite::params![set.event_id.as_str(), kind, entry.sub_key, data, now],
          )?;
          changed.insert("rows");
        }

        if event.state == LifecycleState::Final {
          tx.execute(
            &format!(
              "UPDATE events SET {} = 1, updated_at = ?2 WHERE event_id = ?1",
              flag_column(set.kind)
            ),
            rusqlite::params![set.event_id.as_str(), now],
          )?;
          changed.insert("captured");
        }

        tx.commit()?;

        let report = if stored.is_empty() && !set.entries.is_empty() {
          MergeReport::inserted()
        } else {
          MergeReport::from_changes(changed, Vec::new())
        };
        Ok(report)
      })
      .await?;

    Ok(report)
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn flag_column(kind: ArtifactKind) -> &'static str {
  match kind {
    ArtifactKind::PlayByPlay => "has_play_by_play",
    ArtifactKind::TeamStats => "has_team_stats",
    ArtifactKind::PlayerStats => "has_player_stats",
  }
}

fn select_event(
  conn: &rusqlite::Connection,
  event_id: &str,
) -> rusqlite::Result<Option<RawEvent>> {
  conn
    .query_row(
      &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
      rusqlite::params![event_id],
      RawEvent::from_row,
    )
    .optional()
}

fn upsert_event(conn: &rusqlite::Connection, e: &Event, now: &str) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO events (
       event_id, scheduled_at, game_date, home_team_id, away_team_id,
       state, home_score, away_score, status_detail, venue, last_fetched_at,
       has_play_by_play, has_team_stats, has_player_stats, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
     ON CONFLICT (event_id) DO UPDATE SET
       scheduled_at     = excluded.scheduled_at,
       game_date        = excluded.game_date,
       home_team_id     = excluded.home_team_id,
       away_team_id     = excluded.away_team_id,
       state            = excluded.state,
       home_score       = excluded.home_score,
       away_score       = excluded.away_score,
       status_detail    = excluded.status_detail,
       venue            = excluded.venue,
       last_fetched_at  = excluded.last_fetched_at,
       has_play_by_play = excluded.has_play_by_play,
       has_team_stats   = excluded.has_team_stats,
       has_player_stats = excluded.has_player_stats,
       updated_at       = excluded.updated_at",
    rusqlite::params![
      e.event_id.as_str(),
      encode_dt(e.scheduled_at),
      encode_date(e.game_date),
      e.home_team.as_str(),
      e.away_team.as_str(),
      e.state.as_ref(),
      e.score.map(|s| s.home),
      e.score.map(|s| s.away),
      e.status_detail,
      e.venue,
      e.last_fetched_at.map(encode_dt),
      e.artifacts.play_by_play,
      e.artifacts.team_stats,
      e.artifacts.player_stats,
      now,
    ],
  )?;
  Ok(())
}

fn upsert_team(conn: &rusqlite::Connection, t: &Team, now: &str) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO teams (
       team_id, display_name, short_name, abbreviation, location,
       nickname, conference, logo, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
     ON CONFLICT (team_id) DO UPDATE SET
       display_name = excluded.display_name,
       short_name   = excluded.short_name,
       abbreviation = excluded.abbreviation,
       location     = excluded.location,
       nickname     = excluded.nickname,
       conference   = excluded.conference,
       logo         = excluded.logo,
       updated_at   = excluded.updated_at",
    rusqlite::params![
      t.team_id.as_str(),
      t.display_name,
      t.short_name,
      t.abbreviation,
      t.location,
      t.nickname,
      t.conference,
      t.logo,
      now,
    ],
  )?;
  Ok(())
}

fn upsert_player(conn: &rusqlite::Connection, p: &Player, now: &str) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO players (
       player_id, display_name, short_name, position, jersey, headshot, team_id,
       height, weight, class_year, profile_url, season, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
     ON CONFLICT (player_id) DO UPDATE SET
       display_name = excluded.display_name,
       short_name   = excluded.short_name,
       position     = excluded.position,
       jersey       = excluded.jersey,
       headshot     = excluded.headshot,
       team_id      = excluded.team_id,
       height       = excluded.height,
       weight       = excluded.weight,
       class_year   = excluded.class_year,
       profile_url  = excluded.profile_url,
       season       = excluded.season,
       updated_at   = excluded.updated_at",
    rusqlite::params![
      p.player_id.as_str(),
      p.display_name,
      p.short_name,
      p.position,
      p.jersey,
      p.headshot,
      p.team_id.as_ref().map(TeamId::as_str),
      p.height,
      p.weight,
      p.class_year,
      p.profile_url,
      p.season,
      now,
    ],
  )?;
  Ok(())
}

// ─── MasterStore impl ────────────────────────────────────────────────────────

impl MasterStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn merge(&self, record: Record) -> Result<MergeReport> {
    match record {
      Record::Event(event) => self.merge_event_record(event).await,
      Record::Team(team) => self.merge_team_record(team).await,
      Record::Player(player) => self.merge_player_record(player).await,
      Record::Artifacts(set) => self.merge_artifact_set(set).await,
    }
  }

  async fn reset_event(&self, event_id: &EventId) -> Result<bool> {
    let id_str = event_id.as_str().to_owned();
    let now = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE events SET
             state            = 'unseen',
             has_play_by_play = 0,
             has_team_stats   = 0,
             has_player_stats = 0,
             updated_at       = ?2
           WHERE event_id = ?1",
          rusqlite::params![id_str, now],
        )?)
      })
      .await?;

    Ok(updated > 0)
  }

  // ── Capability queries ────────────────────────────────────────────────────

  async fn exists(&self, kind: RecordKind, id: &str) -> Result<bool> {
    let sql = match kind {
      RecordKind::Event => "SELECT 1 FROM events WHERE event_id = ?1",
      RecordKind::Team => "SELECT 1 FROM teams WHERE team_id = ?1",
      RecordKind::Player => "SELECT 1 FROM players WHERE player_id = ?1",
      RecordKind::Artifact => "SELECT 1 FROM artifacts WHERE event_id = ?1 LIMIT 1",
    };
    let id_str = id.to_owned();

    let found = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(sql, rusqlite::params![id_str], |_| Ok(true))
          .optional()?
          .unwrap_or(false))
      })
      .await?;

    Ok(found)
  }

  async fn needs_artifact(&self, event_id: &EventId, kind: ArtifactKind) -> Result<bool> {
    let id_str = event_id.as_str().to_owned();
    let sql = format!("SELECT {} FROM events WHERE event_id = ?1", flag_column(kind));

    let captured: Option<bool> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params![id_str], |r| r.get(0)).optional()?)
      })
      .await?;

    Ok(!captured.unwrap_or(false))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_event(&self, event_id: &EventId) -> Result<Option<Event>> {
    let id_str = event_id.as_str().to_owned();

    let raw = self
      .conn
      .call(move |conn| Ok(select_event(conn, &id_str)?))
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn events_on(&self, date: NaiveDate) -> Result<Vec<Event>> {
    let date_str = encode_date(date);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM events
           WHERE game_date = ?1
           ORDER BY scheduled_at, event_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![date_str], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn teams(&self) -> Result<Vec<Team>> {
    let teams = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY team_id"))?;
        let rows = stmt
          .query_map([], team_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(teams)
  }

  async fn get_team(&self, team_id: &TeamId) -> Result<Option<Team>> {
    let id_str = team_id.as_str().to_owned();

    let team = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE team_id = ?1"),
            rusqlite::params![id_str],
            team_from_row,
          )
          .optional()?)
      })
      .await?;

    Ok(team)
  }

  async fn get_player(&self, player_id: &PlayerId) -> Result<Option<Player>> {
    let id_str = player_id.as_str().to_owned();

    let player = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE player_id = ?1"),
            rusqlite::params![id_str],
            player_from_row,
          )
          .optional()?)
      })
      .await?;

    Ok(player)
  }

  async fn players_of(&self, team_id: &TeamId) -> Result<Vec<Player>> {
    let id_str = team_id.as_str().to_owned();

    let players = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PLAYER_COLUMNS} FROM players WHERE team_id = ?1 ORDER BY player_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], player_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(players)
  }

  async fn artifacts(&self, event_id: &EventId, kind: ArtifactKind) -> Result<Vec<ArtifactEntry>> {
    let id_str = event_id.as_str().to_owned();
    let kind_str = kind.as_ref().to_owned();

    // Play sequence numbers are numeric; sort them as such.
    let raws: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT sub_key, data_json FROM artifacts
           WHERE event_id = ?1 AND kind = ?2
           ORDER BY CAST(sub_key AS INTEGER), sub_key",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str, kind_str], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(sub_key, json)| Ok(ArtifactEntry { sub_key, data: serde_json::from_str(&json)? }))
      .collect()
  }

  async fn summary(&self) -> Result<StoreSummary> {
    let (by_state, teams, players, artifact_rows): (Vec<(String, i64)>, i64, i64, i64) = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT state, COUNT(*) FROM events GROUP BY state ORDER BY state")?;
        let by_state = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let count = |table: &str| -> rusqlite::Result<i64> {
          conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        };
        Ok((by_state, count("teams")?, count("players")?, count("artifacts")?))
      })
      .await?;

    let events_by_state = by_state
      .into_iter()
      .map(|(state, n)| Ok((decode_state(&state)?, n.max(0) as u64)))
      .collect::<Result<_>>()?;

    Ok(StoreSummary {
      events_by_state,
      teams: teams.max(0) as u64,
      players: players.max(0) as u64,
      artifact_rows: artifact_rows.max(0) as u64,
    })
  }
}

// ─── ScrapeLog impl ──────────────────────────────────────────────────────────

impl ScrapeLog for SqliteStore {
  type Error = Error;

  async fn add(&self, date: NaiveDate, scope: &str) -> Result<bool> {
    let date_str = encode_date(date);
    let scope = scope.to_owned();
    let now = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO scrape_log (game_date, scope, completed_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![date_str, scope, now],
        )?)
      })
      .await?;

    Ok(inserted > 0)
  }

  async fn contains(&self, date: NaiveDate, scope: &str) -> Result<bool> {
    let date_str = encode_date(date);
    let scope = scope.to_owned();

    let found = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM scrape_log WHERE game_date = ?1 AND scope = ?2",
            rusqlite::params![date_str, scope],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;

    Ok(found)
  }

  async fn remove(&self, date: NaiveDate, scope: &str) -> Result<bool> {
    let date_str = encode_date(date);
    let scope = scope.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM scrape_log WHERE game_date = ?1 AND scope = ?2",
          rusqlite::params![date_str, scope],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }

  async fn completed(&self, scope: &str) -> Result<Vec<NaiveDate>> {
    let scope = scope.to_owned();

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT game_date FROM scrape_log WHERE scope = ?1 ORDER BY game_date")?;
        let rows = stmt
          .query_map(rusqlite::params![scope], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_date(s)).collect()
  }

  // ── Rosters ───────────────────────────────────────────────────────────────

  async fn add_roster(&self, team_id: &TeamId, season: i32, scope: &str) -> Result<bool> {
    let id_str = team_id.as_str().to_owned();
    let scope = scope.to_owned();
    let now = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO roster_log (team_id, season, scope, completed_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, season, scope, now],
        )?)
      })
      .await?;

    Ok(inserted > 0)
  }

  async fn has_roster(&self, team_id: &TeamId, season: i32, scope: &str) -> Result<bool> {
    let id_str = team_id.as_str().to_owned();
    let scope = scope.to_owned();

    let found = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM roster_log WHERE team_id = ?1 AND season = ?2 AND scope = ?3",
            rusqlite::params![id_str, season, scope],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;

    Ok(found)
  }

  async fn remove_roster(&self, team_id: &TeamId, season: i32, scope: &str) -> Result<bool> {
    let id_str = team_id.as_str().to_owned();
    let scope = scope.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM roster_log WHERE team_id = ?1 AND season = ?2 AND scope = ?3",
          rusqlite::params![id_str, season, scope],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }
}

// ─── RunLog impl ─────────────────────────────────────────────────────────────

fn run_params(run: &RunRecord) -> (String, String, String, Option<String>, String, [i64; 5]) {
  let count = |n: u64| i64::try_from(n).unwrap_or(i64::MAX);
  (
    run.run_id.hyphenated().to_string(),
    run.mode.as_ref().to_owned(),
    encode_dt(run.started_at),
    run.finished_at.map(encode_dt),
    run.phase.as_ref().to_owned(),
    [
      count(run.candidates),
      count(run.fetched),
      count(run.skipped),
      count(run.failed),
      count(run.conflicts),
    ],
  )
}

impl RunLog for SqliteStore {
  type Error = Error;

  async fn start_run(&self, run: &RunRecord) -> Result<()> {
    let (run_id, mode, started_at, finished_at, phase, [c, f, s, x, k]) = run_params(run);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sync_runs (
             run_id, mode, started_at, finished_at, phase,
             candidates, fetched, skipped, failed, conflicts
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![run_id, mode, started_at, finished_at, phase, c, f, s, x, k],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn finish_run(&self, run: &RunRecord) -> Result<()> {
    let (run_id, mode, started_at, finished_at, phase, [c, f, s, x, k]) = run_params(run);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sync_runs (
             run_id, mode, started_at, finished_at, phase,
             candidates, fetched, skipped, failed, conflicts
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
           ON CONFLICT (run_id) DO UPDATE SET
             finished_at = excluded.finished_at,
             phase       = excluded.phase,
             candidates  = excluded.candidates,
             fetched     = excluded.fetched,
             skipped     = excluded.skipped,
             failed      = excluded.failed,
             conflicts   = excluded.conflicts",
          rusqlite::params![run_id, mode, started_at, finished_at, phase, c, f, s, x, k],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawRun> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RUN_COLUMNS} FROM sync_runs ORDER BY started_at DESC LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], RawRun::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRun::into_run).collect()
  }
}
