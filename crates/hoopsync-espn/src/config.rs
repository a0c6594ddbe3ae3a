//! Connection settings for the ESPN site API, deserialised from the
//! `provider` section of the application config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EspnConfig {
  /// Sport root of the site API, without a trailing slash.
  pub base_url:     String,
  /// League path segment, e.g. `mens-college-basketball`.
  pub league:       String,
  /// Scoreboard `groups` filter. `50` is every Division I conference.
  pub groups:       Option<String>,
  pub timeout_secs: u64,
  pub user_agent:   String,
}

impl Default for EspnConfig {
  fn default() -> Self {
    Self {
      base_url:     "https://site.api.espn.com/apis/site/v2/sports/basketball".to_string(),
      league:       "mens-college-basketball".to_string(),
      groups:       Some("50".to_string()),
      timeout_secs: 20,
      user_agent:   concat!("hoopsync/", env!("CARGO_PKG_VERSION")).to_string(),
    }
  }
}

impl EspnConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  /// `{base}/{league}/{endpoint}`
  pub(crate) fn endpoint(&self, endpoint: &str) -> String {
    format!(
      "{}/{}/{}",
      self.base_url.trim_end_matches('/'),
      self.league.trim_matches('/'),
      endpoint
    )
  }
}
