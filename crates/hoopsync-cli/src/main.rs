//! `hoopsync`: incremental sync of college basketball events into SQLite.
//!
//! # Usage
//!
//! ```
//! hoopsync live
//! hoopsync backfill --from 2024-11-04 --to 2024-12-01
//! hoopsync rosters --season 2025 --team 2 --team 8
//! hoopsync log list
//! hoopsync log remove 2024-12-01
//! hoopsync log forget-roster 2 --season 2025
//! hoopsync reset 401700001
//! hoopsync status
//! ```
//!
//! Exit status: 0 when a run completed, 2 when it finished with per-event
//! failures or was cancelled, 1 on a fatal error.

mod config;
mod shutdown;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context as _, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hoopsync_core::{
  clock::SystemClock,
  event::EventId,
  roster::TeamId,
  store::{MasterStore as _, RunLog as _, RunPhase, ScrapeLog as _},
};
use hoopsync_espn::EspnProvider;
use hoopsync_store_sqlite::SqliteStore;
use hoopsync_sync::{RunReport, SyncEngine, SyncError};
use tracing::{error, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Exit status for a run that finished with failures or was cancelled.
const EXIT_PARTIAL: u8 = 2;
const EXIT_OK: u8 = 0;

type Engine = SyncEngine<SqliteStore, SqliteStore, EspnProvider, SystemClock>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Incremental sports-event sync")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "hoopsync.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
  /// Sync today's events.
  Live,
  /// Sync every date in a range not already in the scrape log.
  Backfill {
    /// First date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    from: NaiveDate,
    /// Last date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    to:   NaiveDate,
  },
  /// Capture season rosters not already in the scrape log.
  Rosters {
    /// Season, named by the year it ends in. Defaults to the current one.
    #[arg(long)]
    season: Option<i32>,
    /// Team to fetch; repeatable. Defaults to every team in the store.
    #[arg(long = "team")]
    teams:  Vec<String>,
  },
  /// Inspect or edit the scrape log.
  Log {
    #[command(subcommand)]
    action: LogAction,
  },
  /// Return an event to unseen so the next run captures it again.
  Reset {
    event_id: String,
  },
  /// Summarise the store and recent runs.
  Status,
}

#[derive(Subcommand, Debug, PartialEq)]
enum LogAction {
  /// List completed dates for the configured scope.
  List,
  /// Forget a date so the next backfill revisits it.
  Remove { date: NaiveDate },
  /// Forget a team's roster so the next roster run fetches it again.
  ForgetRoster {
    team_id: String,
    #[arg(long)]
    season:  i32,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  match run(cli).await {
    Ok(code) => code,
    Err(e) => {
      error!("{e:#}");
      ExitCode::FAILURE
    }
  }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
  let config = AppConfig::load(&cli.config)?;
  let store = SqliteStore::open(&config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.store_path))?;
  let store = Arc::new(store);

  match cli.command {
    Command::Live => finish(engine(&config, store)?.run_live().await),
    Command::Backfill { from, to } => {
      finish(engine(&config, store)?.run_backfill(from, to).await)
    }
    Command::Rosters { season, teams } => {
      let teams = teams.into_iter().map(TeamId::new).collect();
      finish(engine(&config, store)?.run_rosters(season, teams).await)
    }
    Command::Log { action } => log(&config, &store, action).await,
    Command::Reset { event_id } => reset(&store, EventId::new(event_id)).await,
    Command::Status => status(&store).await,
  }
}

// ─── Sync runs ────────────────────────────────────────────────────────────────

fn engine(config: &AppConfig, store: Arc<SqliteStore>) -> anyhow::Result<Engine> {
  let provider =
    EspnProvider::new(config.provider.clone()).context("failed to build ESPN provider")?;
  let engine = SyncEngine::new(
    store.clone(),
    store,
    Arc::new(provider),
    Arc::new(SystemClock),
    config.sync.clone(),
  )
  .context("invalid sync configuration")?;
  Ok(engine.with_cancellation(shutdown::install_signal_handler()))
}

fn finish(result: Result<RunReport, SyncError>) -> anyhow::Result<ExitCode> {
  match result {
    Ok(report) => {
      print_report(&report);
      Ok(ExitCode::from(exit_status(&report)))
    }
    Err(SyncError::Persistence { source, report }) => {
      print_report(&report);
      Err(anyhow::anyhow!(source).context("run aborted by a store failure"))
    }
    Err(e) => Err(e.into()),
  }
}

fn exit_status(report: &RunReport) -> u8 {
  match report.phase {
    RunPhase::Completed => EXIT_OK,
    _ => EXIT_PARTIAL,
  }
}

fn print_report(report: &RunReport) {
  println!("run {} ({}): {}", report.run_id, report.mode, report.phase);
  println!(
    "  dates: {} total, {} already logged, {} completed",
    report.dates_total, report.dates_skipped, report.dates_completed
  );
  println!(
    "  candidates: {} seen, {} skipped, {} fetched, {} merged, {} conflicts",
    report.candidates, report.skipped, report.fetched, report.merged, report.conflicts
  );
  for (kind, count) in report.counts_by_kind() {
    println!("  failures ({kind:?}): {count}");
  }
  for failure in &report.failures {
    let target = match (&failure.event_id, &failure.team_id) {
      (Some(id), _) => format!("event {id}"),
      (None, Some(id)) => format!("roster of team {id}"),
      (None, None) => "schedule".to_string(),
    };
    println!("    {} {target}: {}", failure.date, failure.message);
  }
  if report.cancelled {
    println!("  cancelled before all candidates were attempted");
  }
}

// ─── Administration ───────────────────────────────────────────────────────────

async fn log(
  config: &AppConfig,
  store: &SqliteStore,
  action: LogAction,
) -> anyhow::Result<ExitCode> {
  let scope = &config.sync.scope;
  match action {
    LogAction::List => {
      let dates = store.completed(scope).await.context("failed to read scrape log")?;
      for date in &dates {
        println!("{date}");
      }
      println!("{} completed dates for {scope}", dates.len());
    }
    LogAction::Remove { date } => {
      let removed = store.remove(date, scope).await.context("failed to edit scrape log")?;
      if removed {
        println!("removed {date} from the {scope} scrape log");
      } else {
        println!("{date} was not in the {scope} scrape log");
      }
    }
    LogAction::ForgetRoster { team_id, season } => {
      let team_id = TeamId::new(team_id);
      let removed = store
        .remove_roster(&team_id, season, scope)
        .await
        .context("failed to edit scrape log")?;
      if removed {
        println!("forgot the {season} roster of team {team_id}");
      } else {
        println!("the {season} roster of team {team_id} was not in the {scope} scrape log");
      }
    }
  }
  Ok(ExitCode::SUCCESS)
}

async fn reset(store: &SqliteStore, event_id: EventId) -> anyhow::Result<ExitCode> {
  let found = store
    .reset_event(&event_id)
    .await
    .with_context(|| format!("failed to reset event {event_id}"))?;
  if !found {
    bail!("no event {event_id} in the store");
  }
  println!("event {event_id} reset to unseen; the next run will capture it again");
  Ok(ExitCode::SUCCESS)
}

async fn status(store: &SqliteStore) -> anyhow::Result<ExitCode> {
  let summary = store.summary().await.context("failed to summarise store")?;
  println!("events:");
  for (state, count) in &summary.events_by_state {
    println!("  {state:<10} {count}");
  }
  println!("teams:         {}", summary.teams);
  println!("players:       {}", summary.players);
  println!("artifact rows: {}", summary.artifact_rows);

  let runs = store.recent_runs(10).await.context("failed to read run log")?;
  if !runs.is_empty() {
    println!("recent runs:");
  }
  for run in runs {
    println!(
      "  {} {:<8} {:<20} candidates={} fetched={} skipped={} failed={} conflicts={}",
      run.started_at.format("%Y-%m-%d %H:%M:%S"),
      run.mode.as_ref(),
      run.phase.as_ref(),
      run.candidates,
      run.fetched,
      run.skipped,
      run.failed,
      run.conflicts,
    );
  }
  Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory as _;
  use hoopsync_core::store::RunMode;

  use super::*;

  #[test]
  fn cli_definition_is_consistent() { Cli::command().debug_assert(); }

  #[test]
  fn backfill_takes_an_inclusive_date_range() {
    let cli =
      Cli::try_parse_from(["hoopsync", "backfill", "--from", "2024-11-30", "--to", "2024-12-02"])
        .unwrap();
    assert_eq!(cli.config, PathBuf::from("hoopsync.toml"));
    assert_eq!(
      cli.command,
      Command::Backfill {
        from: NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
        to:   NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(),
      }
    );
  }

  #[test]
  fn malformed_dates_are_rejected() {
    let got = Cli::try_parse_from(["hoopsync", "backfill", "--from", "12/01/2024", "--to", "x"]);
    assert!(got.is_err());
  }

  #[test]
  fn log_and_reset_subcommands_parse() {
    let cli = Cli::try_parse_from(["hoopsync", "-c", "alt.toml", "log", "remove", "2024-12-01"])
      .unwrap();
    assert_eq!(cli.config, PathBuf::from("alt.toml"));
    assert_eq!(
      cli.command,
      Command::Log {
        action: LogAction::Remove { date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap() },
      }
    );

    let cli = Cli::try_parse_from(["hoopsync", "reset", "401700001"]).unwrap();
    assert_eq!(cli.command, Command::Reset { event_id: "401700001".into() });
  }

  #[test]
  fn roster_commands_parse() {
    let cli =
      Cli::try_parse_from(["hoopsync", "rosters", "--season", "2025", "--team", "2", "--team", "8"])
        .unwrap();
    assert_eq!(
      cli.command,
      Command::Rosters { season: Some(2025), teams: vec!["2".into(), "8".into()] }
    );

    let cli = Cli::try_parse_from(["hoopsync", "rosters"]).unwrap();
    assert_eq!(cli.command, Command::Rosters { season: None, teams: Vec::new() });

    let cli =
      Cli::try_parse_from(["hoopsync", "log", "forget-roster", "2", "--season", "2025"]).unwrap();
    assert_eq!(
      cli.command,
      Command::Log { action: LogAction::ForgetRoster { team_id: "2".into(), season: 2025 } }
    );
    assert!(Cli::try_parse_from(["hoopsync", "log", "forget-roster", "2"]).is_err());
  }

  #[test]
  fn only_completed_runs_exit_cleanly() {
    let now = chrono::Utc::now();
    let mut report = RunReport::new(uuid::Uuid::nil(), RunMode::Backfill, now);
    report.finish(now);
    assert_eq!(report.phase, RunPhase::Completed);
    assert_eq!(exit_status(&report), EXIT_OK);

    report.cancelled = true;
    report.finish(now);
    assert_eq!(exit_status(&report), EXIT_PARTIAL);
  }
}
