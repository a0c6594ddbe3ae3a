//! Engine configuration, deserialised from the `sync` section of the
//! application config.

use std::time::Duration;

use chrono::{FixedOffset, TimeDelta};
use hoopsync_core::{artifact::ArtifactKind, store::RunMode};
use serde::{Deserialize, Serialize};

use crate::{backoff::BackoffPolicy, error::SyncError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
  pub base_ms:     u64,
  pub multiplier:  f64,
  pub max_ms:      u64,
  pub max_retries: u32,
}

impl Default for BackoffConfig {
  fn default() -> Self {
    Self { base_ms: 1_000, multiplier: 2.0, max_ms: 30_000, max_retries: 3 }
  }
}

impl From<&BackoffConfig> for BackoffPolicy {
  fn from(c: &BackoffConfig) -> Self {
    Self {
      base:        Duration::from_millis(c.base_ms),
      multiplier:  c.multiplier,
      max:         Duration::from_millis(c.max_ms),
      max_retries: c.max_retries,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// ScrapeLog label for the collection being synchronised.
  pub scope:                      String,
  /// Offset of the zone that defines a game's calendar date.
  pub reference_utc_offset_hours: i32,
  /// Minimum spacing between provider calls in live mode.
  pub live_interval_ms:           u64,
  /// Minimum spacing between provider calls in backfill mode.
  pub backfill_interval_ms:       u64,
  pub fetch_timeout_secs:         u64,
  pub max_concurrent_fetches:     usize,
  /// Hours after tip-off before an unfinished game is marked stale.
  pub stale_horizon_hours:        i64,
  /// Artifacts an event must have captured before it counts as settled.
  pub required_artifacts:         Vec<ArtifactKind>,
  /// Season for roster runs; the current one when unset.
  pub season:                     Option<i32>,
  pub backoff:                    BackoffConfig,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      scope:                      "mens-college-basketball".to_owned(),
      reference_utc_offset_hours: -5,
      live_interval_ms:           1_000,
      backfill_interval_ms:       1_500,
      fetch_timeout_secs:         20,
      max_concurrent_fetches:     1,
      stale_horizon_hours:        36,
      required_artifacts:         ArtifactKind::all(),
      season:                     None,
      backoff:                    BackoffConfig::default(),
    }
  }
}

impl SyncConfig {
  pub fn reference_offset(&self) -> Result<FixedOffset, SyncError> {
    self
      .reference_utc_offset_hours
      .checked_mul(3600)
      .and_then(FixedOffset::east_opt)
      .ok_or_else(|| {
        SyncError::Config(format!(
          "reference_utc_offset_hours out of range: {}",
          self.reference_utc_offset_hours
        ))
      })
  }

  pub fn spacing(&self, mode: RunMode) -> Duration {
    match mode {
      RunMode::Live => Duration::from_millis(self.live_interval_ms),
      RunMode::Backfill | RunMode::Roster => Duration::from_millis(self.backfill_interval_ms),
    }
  }

  pub fn fetch_timeout(&self) -> Duration { Duration::from_secs(self.fetch_timeout_secs) }

  pub fn stale_horizon(&self) -> Result<TimeDelta, SyncError> {
    TimeDelta::try_hours(self.stale_horizon_hours)
      .filter(|h| *h > TimeDelta::zero())
      .ok_or_else(|| {
        SyncError::Config(format!("invalid stale_horizon_hours: {}", self.stale_horizon_hours))
      })
  }

  pub fn backoff_policy(&self) -> BackoffPolicy { BackoffPolicy::from(&self.backoff) }

  /// Check everything that can be checked before a run starts.
  pub fn validate(&self) -> Result<(), SyncError> {
    self.reference_offset()?;
    self.stale_horizon()?;
    if self.scope.trim().is_empty() {
      return Err(SyncError::Config("scope must not be empty".into()));
    }
    if self.fetch_timeout_secs == 0 {
      return Err(SyncError::Config("fetch_timeout_secs must be positive".into()));
    }
    if !self.backoff.multiplier.is_finite() || self.backoff.base_ms > self.backoff.max_ms {
      return Err(SyncError::Config("backoff needs a finite multiplier and base <= max".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_validate() {
    let config = SyncConfig::default();
    config.validate().unwrap();
    assert_eq!(config.reference_offset().unwrap(), FixedOffset::west_opt(5 * 3600).unwrap());
    assert_eq!(config.spacing(RunMode::Backfill), Duration::from_millis(1500));
    assert_eq!(config.spacing(RunMode::Roster), config.spacing(RunMode::Backfill));
    assert_eq!(config.backoff_policy(), BackoffPolicy::default());
  }

  #[test]
  fn nonsense_is_rejected() {
    let bad_offset = SyncConfig { reference_utc_offset_hours: 30, ..SyncConfig::default() };
    assert!(bad_offset.validate().is_err());

    let bad_horizon = SyncConfig { stale_horizon_hours: 0, ..SyncConfig::default() };
    assert!(bad_horizon.validate().is_err());
  }
}
