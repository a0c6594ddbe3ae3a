//! SQL schema for the hoopsync SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Master event records. Rows are never deleted; a final event only changes
-- through an administrative reset.
CREATE TABLE IF NOT EXISTS events (
    event_id         TEXT PRIMARY KEY,
    scheduled_at     TEXT NOT NULL,   -- RFC 3339 UTC
    game_date        TEXT NOT NULL,   -- YYYY-MM-DD in the reference zone
    home_team_id     TEXT NOT NULL,
    away_team_id     TEXT NOT NULL,
    state            TEXT NOT NULL,   -- 'unseen' | 'scheduled' | 'live' | 'final' | 'stale'
    home_score       INTEGER,
    away_score       INTEGER,
    status_detail    TEXT,
    venue            TEXT,
    last_fetched_at  TEXT,
    has_play_by_play INTEGER NOT NULL DEFAULT 0,
    has_team_stats   INTEGER NOT NULL DEFAULT 0,
    has_player_stats INTEGER NOT NULL DEFAULT 0,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS teams (
    team_id      TEXT PRIMARY KEY,
    display_name TEXT,
    short_name   TEXT,
    abbreviation TEXT,
    location     TEXT,
    nickname     TEXT,
    conference   TEXT,
    logo         TEXT,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS players (
    player_id    TEXT PRIMARY KEY,
    display_name TEXT,
    short_name   TEXT,
    position     TEXT,
    jersey       TEXT,
    headshot     TEXT,
    team_id      TEXT,            -- last team observed; lookup key only
    height       TEXT,
    weight       TEXT,
    class_year   TEXT,
    profile_url  TEXT,
    season       INTEGER,         -- last roster season the player was on
    updated_at   TEXT NOT NULL
);

-- One row per (event, kind, sub_key): a play, a team line or a player line.
CREATE TABLE IF NOT EXISTS artifacts (
    event_id   TEXT NOT NULL REFERENCES events(event_id),
    kind       TEXT NOT NULL,     -- 'play_by_play' | 'team_stats' | 'player_stats'
    sub_key    TEXT NOT NULL,
    data_json  TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (event_id, kind, sub_key)
);

CREATE TABLE IF NOT EXISTS scrape_log (
    game_date    TEXT NOT NULL,
    scope        TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    PRIMARY KEY (game_date, scope)
);

-- Rosters already captured, one row per (team, season, scope).
CREATE TABLE IF NOT EXISTS roster_log (
    team_id      TEXT NOT NULL,
    season       INTEGER NOT NULL,
    scope        TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    PRIMARY KEY (team_id, season, scope)
);

CREATE TABLE IF NOT EXISTS sync_runs (
    run_id      TEXT PRIMARY KEY,
    mode        TEXT NOT NULL,    -- 'live' | 'backfill' | 'roster'
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    phase       TEXT NOT NULL,
    candidates  INTEGER NOT NULL DEFAULT 0,
    fetched     INTEGER NOT NULL DEFAULT 0,
    skipped     INTEGER NOT NULL DEFAULT 0,
    failed      INTEGER NOT NULL DEFAULT 0,
    conflicts   INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS events_date_idx     ON events(game_date);
CREATE INDEX IF NOT EXISTS players_team_idx    ON players(team_id);
CREATE INDEX IF NOT EXISTS sync_runs_start_idx ON sync_runs(started_at);

PRAGMA user_version = 1;
";
