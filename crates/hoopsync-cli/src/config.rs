//! Layered application configuration: defaults, then an optional TOML file,
//! then `HOOPSYNC_*` environment variables.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `HOOPSYNC_SYNC__MAX_CONCURRENT_FETCHES=4` or
//! `HOOPSYNC_PROVIDER__TIMEOUT_SECS=10`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use hoopsync_espn::EspnConfig;
use hoopsync_sync::SyncConfig;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// SQLite file holding the master store, scrape log and run log.
  pub store_path: PathBuf,
  pub provider:   EspnConfig,
  pub sync:       SyncConfig,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("hoopsync.db"),
      provider:   EspnConfig::default(),
      sync:       SyncConfig::default(),
    }
  }
}

impl AppConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let builder = Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(environment());
    Self::from_builder(builder)
      .with_context(|| format!("failed to load configuration from {}", path.display()))
  }

  fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
    let settings = builder.build().context("failed to read configuration")?;
    let mut config: Self = settings
      .try_deserialize()
      .context("failed to deserialise configuration")?;
    config.store_path = expand_tilde(&config.store_path);
    Ok(config)
  }
}

fn environment() -> Environment {
  Environment::with_prefix("HOOPSYNC")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
    .list_separator(",")
    .with_list_parse_key("sync.required_artifacts")
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
