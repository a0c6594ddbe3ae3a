//! Domain model for hoopsync: events, teams, players and artifacts, the
//! lifecycle classifier, the merge policy, and the store, provider and clock
//! traits the engine is written against.
//!
//! No HTTP or SQL lives here; adapters implement the traits in their own
//! crates.

// Trait signatures spell out `Send` futures; impls may use `async fn`.
#![allow(async_fn_in_trait)]

/// Declare a newtype over a provider-assigned string identifier.
macro_rules! provider_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
      serde::Serialize, serde::Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub String);

    impl $name {
      pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

      pub fn as_str(&self) -> &str { &self.0 }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl From<&str> for $name {
      fn from(s: &str) -> Self { Self(s.to_owned()) }
    }
  };
}

pub mod artifact;
pub mod clock;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod merge;
pub mod provider;
pub mod roster;
pub mod store;

pub use error::{ClassificationError, Error, FetchError, MergeConflict, Result};
