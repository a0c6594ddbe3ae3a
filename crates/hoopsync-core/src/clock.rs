//! Time sources and date scopes.

use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Utc};

use crate::{Error, Result};

/// Supplies "now". Injected so runs are reproducible in tests.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  /// Today's calendar date in the reference zone.
  fn today(&self, zone: FixedOffset) -> NaiveDate {
    self.now().with_timezone(&zone).date_naive()
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(now: DateTime<Utc>) -> Self { Self { now: Mutex::new(now) } }

  pub fn set(&self, now: DateTime<Utc>) {
    *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
  }

  pub fn advance(&self, by: TimeDelta) {
    let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
    *now += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap_or_else(|e| e.into_inner())
  }
}

// ─── Date ranges ─────────────────────────────────────────────────────────────

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  from: NaiveDate,
  to:   NaiveDate,
}

impl DateRange {
  pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
    if from > to {
      return Err(Error::InvalidDateRange { from, to });
    }
    Ok(Self { from, to })
  }

  pub fn from(&self) -> NaiveDate { self.from }

  pub fn to(&self) -> NaiveDate { self.to }

  pub fn days(self) -> impl Iterator<Item = NaiveDate> {
    let to = self.to;
    self.from.iter_days().take_while(move |d| *d <= to)
  }
}
