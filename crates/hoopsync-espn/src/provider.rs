//! [`EspnProvider`]: the reqwest-backed [`Provider`] implementation.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use chrono::NaiveDate;
use hoopsync_core::{
  FetchError,
  artifact::{ArtifactKind, ArtifactPayload},
  event::EventId,
  provider::{EventDetail, EventStub, Provider},
  roster::{Roster, TeamId},
};
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use tracing::debug;

use crate::{
  config::EspnConfig,
  error::{Error, Result},
  model::{Scoreboard, Summary, WireRoster},
  parse,
};

/// How long a fetched summary is reused for artifact extraction.
const SUMMARY_TTL: Duration = Duration::from_secs(60);
/// Cached summaries beyond this count trigger an eviction sweep.
const SUMMARY_CACHE_LIMIT: usize = 64;

/// Reads schedules from the scoreboard endpoint, everything per-event
/// from the game summary endpoint, and rosters from the team endpoint.
///
/// The summary carries the header, boxscore and plays in one document, so
/// one response is cached per event and shared by the detail fetch and the
/// three artifact fetches that follow it.
pub struct EspnProvider {
  client:    Client,
  config:    EspnConfig,
  summaries: Mutex<HashMap<EventId, (Instant, Arc<Summary>)>>,
}

impl EspnProvider {
  pub fn new(config: EspnConfig) -> Result<Self> {
    if config.base_url.trim().is_empty() {
      return Err(Error::Config("provider.base_url is empty".into()));
    }
    if config.league.trim().is_empty() {
      return Err(Error::Config("provider.league is empty".into()));
    }

    let client = Client::builder()
      .timeout(config.timeout())
      .user_agent(config.user_agent.clone())
      .build()?;
    Ok(Self { client, config, summaries: Mutex::new(HashMap::new()) })
  }

  pub fn config(&self) -> &EspnConfig { &self.config }

  // ── HTTP ──────────────────────────────────────────────────────────────────

  async fn get(
    &self,
    endpoint: &str,
    query: &[(&str, String)],
    what: &str,
  ) -> Result<Vec<u8>, FetchError> {
    let url = self.config.endpoint(endpoint);
    debug!(url = %url, ?query, "GET");

    let resp = self
      .client
      .get(&url)
      .query(query)
      .send()
      .await
      .map_err(transport_error)?;

    let status = resp.status();
    if !status.is_success() {
      return Err(status_error(status, resp.headers().get(RETRY_AFTER), what));
    }

    let body = resp.bytes().await.map_err(transport_error)?;
    Ok(body.to_vec())
  }

  // ── Summary cache ─────────────────────────────────────────────────────────

  async fn fetch_summary(&self, event_id: &EventId) -> Result<Arc<Summary>, FetchError> {
    let what = format!("summary for event {event_id}");
    let body = self
      .get("summary", &[("event", event_id.to_string())], &what)
      .await?;
    let summary = Arc::new(parse::decode::<Summary>(&body, &what)?);

    if let Ok(mut cache) = self.summaries.lock() {
      if cache.len() >= SUMMARY_CACHE_LIMIT {
        cache.retain(|_, (at, _)| at.elapsed() < SUMMARY_TTL);
      }
      if cache.len() >= SUMMARY_CACHE_LIMIT {
        cache.clear();
      }
      cache.insert(event_id.clone(), (Instant::now(), summary.clone()));
    }
    Ok(summary)
  }

  fn cached_summary(&self, event_id: &EventId) -> Option<Arc<Summary>> {
    let cache = self.summaries.lock().ok()?;
    cache
      .get(event_id)
      .filter(|(at, _)| at.elapsed() < SUMMARY_TTL)
      .map(|(_, summary)| summary.clone())
  }
}

impl Provider for EspnProvider {
  async fn fetch_schedule(&self, date: NaiveDate) -> Result<Vec<EventStub>, FetchError> {
    let what = format!("scoreboard for {date}");
    let mut query = vec![
      ("dates", date.format("%Y%m%d").to_string()),
      ("limit", "400".to_string()),
    ];
    if let Some(groups) = &self.config.groups {
      query.push(("groups", groups.clone()));
    }

    let body = self.get("scoreboard", &query, &what).await?;
    let board: Scoreboard = parse::decode(&body, &what)?;
    parse::schedule_from(board)
  }

  /// Always hits the network so a live game's state is current.
  async fn fetch_event_detail(&self, event_id: &EventId) -> Result<EventDetail, FetchError> {
    let summary = self.fetch_summary(event_id).await?;
    parse::detail_from(&summary)
  }

  async fn fetch_artifact(
    &self,
    event_id: &EventId,
    kind: ArtifactKind,
  ) -> Result<ArtifactPayload, FetchError> {
    let summary = match self.cached_summary(event_id) {
      Some(summary) => summary,
      None => self.fetch_summary(event_id).await?,
    };
    Ok(parse::artifact_from(&summary, kind))
  }

  async fn fetch_roster(&self, team_id: &TeamId, season: i32) -> Result<Roster, FetchError> {
    let what = format!("roster for team {team_id}, season {season}");
    let body = self
      .get(&format!("teams/{team_id}/roster"), &[("season", season.to_string())], &what)
      .await?;
    let wire: WireRoster = parse::decode(&body, &what)?;
    Ok(parse::roster_from(team_id, season, wire))
  }
}

// ─── Error mapping ───────────────────────────────────────────────────────────

fn transport_error(e: reqwest::Error) -> FetchError {
  if e.is_timeout() {
    FetchError::Timeout
  } else if e.is_decode() {
    FetchError::Malformed(e.to_string())
  } else {
    FetchError::Transport(e.to_string())
  }
}

/// Map a non-success status, honouring a `Retry-After` given in seconds.
pub(crate) fn status_error(
  status: StatusCode,
  retry_after: Option<&reqwest::header::HeaderValue>,
  what: &str,
) -> FetchError {
  match FetchError::from_status(status.as_u16(), what) {
    FetchError::RateLimited { .. } => FetchError::RateLimited {
      retry_after: retry_after
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs),
    },
    other => other,
  }
}
