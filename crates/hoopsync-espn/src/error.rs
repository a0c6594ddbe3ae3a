use thiserror::Error;

/// Failures constructing the provider. Per-request failures are reported as
/// [`hoopsync_core::FetchError`] instead.
#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),

  #[error("invalid provider configuration: {0}")]
  Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
