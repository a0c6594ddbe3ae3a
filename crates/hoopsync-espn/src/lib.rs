//! ESPN site API adapter for hoopsync.
//!
//! [`EspnProvider`] implements [`hoopsync_core::provider::Provider`] over two
//! public endpoints: the per-day scoreboard for schedules and the per-game
//! summary for event detail, play-by-play and box scores.

pub mod config;
pub mod error;
pub mod model;
pub mod parse;
pub mod provider;

pub use config::EspnConfig;
pub use error::{Error, Result};
pub use provider::EspnProvider;

#[cfg(test)]
mod tests;
