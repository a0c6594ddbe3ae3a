//! [`SyncEngine`]: one live, backfill or roster run over the injected
//! store, provider and clock.

use std::{pin::pin, sync::Arc};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures_util::{StreamExt as _, future, stream};
use hoopsync_core::{
  artifact::{ArtifactKind, ArtifactPayload, ArtifactSet},
  clock::{Clock, DateRange},
  event::{Event, EventId},
  lifecycle::{Classifier, LifecycleState, Observation},
  merge::{MergeReport, Record},
  provider::{EventDetail, EventStub, Provider},
  roster::{Team, TeamId, season_of},
  store::{MasterStore, RunLog, RunMode, RunPhase, ScrapeLog},
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
  config::SyncConfig,
  error::{BoxError, SyncError, boxed},
  limiter::RateLimiter,
  report::{CandidateFailure, RunReport},
};

// ─── Work items ──────────────────────────────────────────────────────────────

/// What a run walks through.
#[derive(Debug)]
enum Scope {
  Dates(Vec<NaiveDate>),
  /// An empty team list means every team in the store.
  Rosters { season: i32, teams: Vec<TeamId> },
}

/// What a candidate still needs from the provider.
#[derive(Debug)]
enum Job {
  /// Fetch the detail, classify, then fetch artifacts if the game has begun.
  Full {
    stub:      EventStub,
    previous:  LifecycleState,
    /// Last successful observation of a stored event.
    last_seen: Option<DateTime<Utc>>,
    missing:   Vec<ArtifactKind>,
  },
  /// The event is final; only some artifacts are outstanding.
  ArtifactsOnly {
    event_id: EventId,
    missing:  Vec<ArtifactKind>,
  },
}

impl Job {
  fn event_id(&self) -> &EventId {
    match self {
      Self::Full { stub, .. } => &stub.event_id,
      Self::ArtifactsOnly { event_id, .. } => event_id,
    }
  }
}

/// Everything one candidate produced, merged later by the run loop.
#[derive(Debug)]
struct Fetched {
  event_id: EventId,
  event:    Option<Event>,
  teams:    Vec<Team>,
  payloads: Vec<ArtifactPayload>,
  failure:  Option<CandidateFailure>,
}

impl Fetched {
  fn new(event_id: EventId) -> Self {
    Self { event_id, event: None, teams: Vec::new(), payloads: Vec::new(), failure: None }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The synchronisation engine.
///
/// The engine is the single writer for its store: fetches for several
/// candidates may be in flight at once, but every merge happens on the run
/// loop in completion order.
pub struct SyncEngine<S, L, P, C> {
  store:      Arc<S>,
  log:        Arc<L>,
  provider:   Arc<P>,
  clock:      Arc<C>,
  config:     SyncConfig,
  zone:       FixedOffset,
  classifier: Classifier,
  cancel:     CancellationToken,
}

impl<S, L, P, C> SyncEngine<S, L, P, C>
where
  S: MasterStore,
  L: ScrapeLog + RunLog,
  P: Provider,
  C: Clock,
{
  pub fn new(
    store: Arc<S>,
    log: Arc<L>,
    provider: Arc<P>,
    clock: Arc<C>,
    config: SyncConfig,
  ) -> Result<Self, SyncError> {
    config.validate()?;
    let zone = config.reference_offset()?;
    let classifier = Classifier::new(config.stale_horizon()?);
    Ok(Self {
      store,
      log,
      provider,
      clock,
      config,
      zone,
      classifier,
      cancel: CancellationToken::new(),
    })
  }

  /// Stop starting new candidates once `token` is cancelled.
  pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
    self.cancel = token;
    self
  }

  pub fn config(&self) -> &SyncConfig { &self.config }

  // ── Entry points ──────────────────────────────────────────────────────────

  /// Synchronise today's events, today being taken in the reference zone.
  pub async fn run_live(&self) -> Result<RunReport, SyncError> {
    let today = self.clock.today(self.zone);
    self.run(RunMode::Live, Scope::Dates(vec![today])).await
  }

  /// Synchronise every date in `[from, to]` not already in the scrape log.
  pub async fn run_backfill(&self, from: NaiveDate, to: NaiveDate) -> Result<RunReport, SyncError> {
    let range = DateRange::new(from, to)?;
    self.run(RunMode::Backfill, Scope::Dates(range.days().collect())).await
  }

  /// Capture season rosters for `teams`, or for every stored team when the
  /// list is empty. Rosters already in the scrape log are skipped. The
  /// season falls back to the configured one, then to the current one.
  pub async fn run_rosters(
    &self,
    season: Option<i32>,
    teams: Vec<TeamId>,
  ) -> Result<RunReport, SyncError> {
    let season = season
      .or(self.config.season)
      .unwrap_or_else(|| season_of(self.clock.today(self.zone)));
    self.run(RunMode::Roster, Scope::Rosters { season, teams }).await
  }

  async fn run(&self, mode: RunMode, scope: Scope) -> Result<RunReport, SyncError> {
    let mut report = RunReport::new(Uuid::new_v4(), mode, self.clock.now());
    if let Scope::Dates(dates) = &scope {
      report.dates_total = dates.len() as u64;
    }

    let span = info_span!("sync_run", run_id = %report.run_id, %mode);
    async move {
      info!(scope = %self.config.scope, "run started");

      let limiter = RateLimiter::new(
        self.config.spacing(mode),
        self.config.fetch_timeout(),
        self.config.backoff_policy(),
      );

      let outcome = match self.log.start_run(&report.record()).await {
        Ok(()) => match scope {
          Scope::Dates(dates) => self.run_dates(mode, &dates, &limiter, &mut report).await,
          Scope::Rosters { season, teams } => {
            self.run_rosters_for(season, teams, &limiter, &mut report).await
          }
        },
        Err(e) => Err(boxed(e)),
      };

      if let Err(source) = outcome {
        report.abort(self.clock.now());
        error!(error = %source, "run aborted");
        if let Err(e) = self.log.finish_run(&report.record()).await {
          warn!(error = %e, "could not record aborted run");
        }
        return Err(SyncError::Persistence { source, report: Box::new(report) });
      }

      report.finish(self.clock.now());
      if let Err(e) = self.log.finish_run(&report.record()).await {
        return Err(SyncError::Persistence { source: boxed(e), report: Box::new(report) });
      }

      info!(
        phase = %report.phase,
        candidates = report.candidates,
        skipped = report.skipped,
        fetched = report.fetched,
        merged = report.merged,
        conflicts = report.conflicts,
        failed = report.failures.len(),
        dates_completed = report.dates_completed,
        "run finished"
      );
      Ok(report)
    }
    .instrument(span)
    .await
  }

  async fn run_dates(
    &self,
    mode: RunMode,
    dates: &[NaiveDate],
    limiter: &RateLimiter,
    report: &mut RunReport,
  ) -> Result<(), BoxError> {
    for &date in dates {
      if self.cancel.is_cancelled() {
        report.cancelled = true;
        break;
      }

      if mode == RunMode::Backfill
        && self.log.contains(date, &self.config.scope).await.map_err(boxed)?
      {
        debug!(%date, "date already complete");
        report.dates_skipped += 1;
        continue;
      }

      let complete = self.sync_date(date, limiter, report).await?;

      if mode == RunMode::Backfill && complete {
        self.log.add(date, &self.config.scope).await.map_err(boxed)?;
        report.dates_completed += 1;
        info!(%date, "date complete");
      }
    }
    Ok(())
  }

  // ── One date ──────────────────────────────────────────────────────────────

  /// Process one date. Returns whether every candidate succeeded and is
  /// settled, i.e. whether the date may go into the scrape log.
  async fn sync_date(
    &self,
    date: NaiveDate,
    limiter: &RateLimiter,
    report: &mut RunReport,
  ) -> Result<bool, BoxError> {
    report.phase = RunPhase::Enumerating;
    let provider = &*self.provider;
    let stubs = match limiter.execute("schedule", move || provider.fetch_schedule(date)).await {
      Ok(stubs) => stubs,
      Err(e) => {
        warn!(%date, error = %e, "schedule fetch failed");
        report.failures.push(CandidateFailure::fetch(date, None, &e));
        return Ok(false);
      }
    };
    debug!(%date, events = stubs.len(), "schedule fetched");

    for team in stubs.iter().flat_map(|s| [&s.home, &s.away]) {
      let merged = self.store.merge(Record::Team(team.clone())).await.map_err(boxed)?;
      tally(&merged, report);
    }

    let candidates: Vec<EventId> = stubs.iter().map(|s| s.event_id.clone()).collect();
    let mut work = Vec::new();
    for stub in stubs {
      report.candidates += 1;
      match self.plan(stub).await? {
        Some(job) => work.push(job),
        None => report.skipped += 1,
      }
    }

    report.phase = RunPhase::Fetching;
    let failures_before = report.failures.len();
    let cancel = &self.cancel;
    let mut results = pin!(
      stream::iter(work)
        .take_while(|_| future::ready(!cancel.is_cancelled()))
        .map(|job| self.fetch(date, job, limiter))
        .buffer_unordered(self.config.max_concurrent_fetches.max(1))
    );

    while let Some(fetched) = results.next().await {
      report.phase = RunPhase::Merging;
      report.fetched += 1;
      self.commit(fetched, report).await?;
    }

    if self.cancel.is_cancelled() {
      report.cancelled = true;
      return Ok(false);
    }
    if report.failures.len() > failures_before {
      return Ok(false);
    }

    let required = &self.config.required_artifacts;
    for event_id in &candidates {
      let settled = self
        .store
        .get_event(event_id)
        .await
        .map_err(boxed)?
        .is_some_and(|e| e.is_satisfied(required));
      if !settled {
        debug!(%date, %event_id, "date left open: event not settled");
        return Ok(false);
      }
    }
    Ok(true)
  }

  /// Decide what, if anything, a candidate needs. `None` means skip.
  async fn plan(&self, stub: EventStub) -> Result<Option<Job>, BoxError> {
    let required = &self.config.required_artifacts;
    let stored = self.store.get_event(&stub.event_id).await.map_err(boxed)?;

    let Some(stored) = stored else {
      return Ok(Some(Job::Full {
        stub,
        previous: LifecycleState::Unseen,
        last_seen: None,
        missing: required.clone(),
      }));
    };

    let mut missing = Vec::new();
    for &kind in required {
      if self.store.needs_artifact(&stored.event_id, kind).await.map_err(boxed)? {
        missing.push(kind);
      }
    }

    match stored.state {
      LifecycleState::Final if missing.is_empty() => {
        debug!(event_id = %stub.event_id, "final and fully captured, skipping");
        Ok(None)
      }
      LifecycleState::Final => {
        Ok(Some(Job::ArtifactsOnly { event_id: stub.event_id, missing }))
      }
      LifecycleState::Stale if stored.scheduled_at == stub.scheduled_at => {
        debug!(event_id = %stub.event_id, "stale, awaiting review");
        Ok(None)
      }
      previous => {
        let last_seen = stored.last_fetched_at.or(Some(stored.scheduled_at));
        Ok(Some(Job::Full { stub, previous, last_seen, missing }))
      }
    }
  }

  // ── Rosters ───────────────────────────────────────────────────────────────

  async fn run_rosters_for(
    &self,
    season: i32,
    teams: Vec<TeamId>,
    limiter: &RateLimiter,
    report: &mut RunReport,
  ) -> Result<(), BoxError> {
    report.phase = RunPhase::Enumerating;
    let teams: Vec<TeamId> = if teams.is_empty() {
      let stored = self.store.teams().await.map_err(boxed)?;
      stored.into_iter().map(|t| t.team_id).collect()
    } else {
      teams
    };
    info!(season, teams = teams.len(), "roster run");

    let scope = &self.config.scope;
    let mut work = Vec::new();
    for team_id in teams {
      report.candidates += 1;
      if self.log.has_roster(&team_id, season, scope).await.map_err(boxed)? {
        debug!(%team_id, season, "roster already captured");
        report.skipped += 1;
      } else {
        work.push(team_id);
      }
    }

    report.phase = RunPhase::Fetching;
    let provider = &*self.provider;
    let cancel = &self.cancel;
    let mut results = pin!(
      stream::iter(work)
        .take_while(|_| future::ready(!cancel.is_cancelled()))
        .map(|team_id| async move {
          let id = &team_id;
          let fetched =
            limiter.execute("roster", move || provider.fetch_roster(id, season)).await;
          (team_id, fetched)
        })
        .buffer_unordered(self.config.max_concurrent_fetches.max(1))
    );

    let today = self.clock.today(self.zone);
    while let Some((team_id, fetched)) = results.next().await {
      report.phase = RunPhase::Merging;
      report.fetched += 1;
      let roster = match fetched {
        Ok(roster) => roster,
        Err(e) => {
          warn!(%team_id, season, error = %e, "roster fetch failed");
          report.failures.push(CandidateFailure::roster(today, team_id, &e));
          continue;
        }
      };
      if roster.players.is_empty() {
        warn!(%team_id, season, "roster is empty");
      }
      for mut player in roster.players {
        player.team_id = Some(team_id.clone());
        player.season = Some(season);
        let merged = self.store.merge(Record::Player(player)).await.map_err(boxed)?;
        tally(&merged, report);
      }
      self.log.add_roster(&team_id, season, scope).await.map_err(boxed)?;
      debug!(%team_id, season, "roster captured");
    }

    if self.cancel.is_cancelled() {
      report.cancelled = true;
    }
    Ok(())
  }

  // ── One candidate ─────────────────────────────────────────────────────────

  /// Fetch everything a job needs. Never touches the store.
  async fn fetch(&self, date: NaiveDate, job: Job, limiter: &RateLimiter) -> Fetched {
    let mut out = Fetched::new(job.event_id().clone());
    let provider = &*self.provider;

    let missing = match job {
      Job::ArtifactsOnly { missing, .. } => missing,
      Job::Full { stub, previous, last_seen, missing } => {
        let event_id = &stub.event_id;
        let detail = match limiter
          .execute("event detail", move || provider.fetch_event_detail(event_id))
          .await
        {
          Ok(detail) => detail,
          Err(e) if self.is_overdue(&stub, last_seen) => {
            warn!(%date, %event_id, error = %e, "overdue event fetch failed, marking stale");
            out.event = Some(self.stale_from(date, &stub));
            return out;
          }
          Err(e) => {
            warn!(%date, %event_id, error = %e, "event fetch failed");
            out.failure = Some(CandidateFailure::fetch(date, Some(event_id.clone()), &e));
            return out;
          }
        };

        let observation = Observation {
          status:       &detail.status.code,
          scheduled_at: Some(detail.scheduled_at),
          observed_at:  self.clock.now(),
        };
        let state = match self.classifier.classify(previous, &observation) {
          Ok(c) => c.state,
          Err(e) => {
            warn!(%date, %event_id, error = %e, "could not classify event");
            out.failure = Some(CandidateFailure::classification(date, event_id.clone(), &e));
            return out;
          }
        };

        out.event = Some(self.event_from(date, &detail, state));
        out.teams = vec![detail.home, detail.away];

        if !matches!(state, LifecycleState::Live | LifecycleState::Final) {
          return out;
        }
        missing
      }
    };

    for kind in missing {
      let event_id = &out.event_id;
      match limiter
        .execute(kind.as_ref(), move || provider.fetch_artifact(event_id, kind))
        .await
      {
        Ok(payload) => out.payloads.push(payload),
        Err(e) => {
          warn!(%date, %event_id, %kind, error = %e, "artifact fetch failed");
          if out.failure.is_none() {
            out.failure = Some(CandidateFailure::fetch(date, Some(event_id.clone()), &e));
          }
        }
      }
    }
    out
  }

  fn event_from(&self, date: NaiveDate, detail: &EventDetail, state: LifecycleState) -> Event {
    Event {
      event_id: detail.event_id.clone(),
      scheduled_at: detail.scheduled_at,
      game_date: date,
      home_team: detail.home.team_id.clone(),
      away_team: detail.away.team_id.clone(),
      state,
      score: detail.score,
      status_detail: detail.status.detail.clone(),
      venue: detail.venue.clone(),
      last_fetched_at: Some(self.clock.now()),
      artifacts: Default::default(),
    }
  }

  /// Whether a stored event has gone a whole stale horizon, counted from
  /// both its tip-off and its last successful observation, without news.
  /// Events never stored are not overdue; they have nothing to flag yet.
  fn is_overdue(&self, stub: &EventStub, last_seen: Option<DateTime<Utc>>) -> bool {
    let Some(last_seen) = last_seen else {
      return false;
    };
    let since = last_seen.max(stub.scheduled_at);
    self.clock.now() - since > self.classifier.stale_horizon
  }

  /// The schedule's view of an event, flagged for review.
  fn stale_from(&self, date: NaiveDate, stub: &EventStub) -> Event {
    Event {
      event_id: stub.event_id.clone(),
      scheduled_at: stub.scheduled_at,
      game_date: date,
      home_team: stub.home.team_id.clone(),
      away_team: stub.away.team_id.clone(),
      state: LifecycleState::Stale,
      score: None,
      status_detail: None,
      venue: None,
      last_fetched_at: None,
      artifacts: Default::default(),
    }
  }

  // ── Merging ───────────────────────────────────────────────────────────────

  /// Fold one candidate's results into the store. The event goes first so
  /// that artifacts see its new lifecycle state.
  async fn commit(&self, fetched: Fetched, report: &mut RunReport) -> Result<(), BoxError> {
    let Fetched { event_id, event, teams, payloads, failure } = fetched;

    if let Some(event) = event {
      let merged = self.store.merge(Record::Event(event)).await.map_err(boxed)?;
      tally(&merged, report);
    }
    for team in teams {
      let merged = self.store.merge(Record::Team(team)).await.map_err(boxed)?;
      tally(&merged, report);
    }
    for payload in payloads {
      for player in payload.players {
        let merged = self.store.merge(Record::Player(player)).await.map_err(boxed)?;
        tally(&merged, report);
      }
      let set = ArtifactSet {
        event_id: event_id.clone(),
        kind:     payload.kind,
        entries:  payload.entries,
      };
      let merged = self.store.merge(Record::Artifacts(set)).await.map_err(boxed)?;
      tally(&merged, report);
    }

    if let Some(failure) = failure {
      report.failures.push(failure);
    }
    Ok(())
  }
}

fn tally(merged: &MergeReport, report: &mut RunReport) {
  if !merged.is_no_op() {
    report.merged += 1;
  }
  for conflict in &merged.conflicts {
    warn!(%conflict, "merge conflict");
    report.conflicts += 1;
  }
}
