//! SQLite backend for the hoopsync master store, scrape log and run log.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every merge is a single transaction,
//! so a record is either fully folded in or not touched at all.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
