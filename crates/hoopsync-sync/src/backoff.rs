//! Exponential backoff schedule.
//!
//! The schedule is pure: it only computes delays. Sleeping is left to the
//! [`RateLimiter`](crate::RateLimiter).

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
  pub base:        Duration,
  pub multiplier:  f64,
  pub max:         Duration,
  /// Retries after the first attempt; `0` disables retrying.
  pub max_retries: u32,
}

impl Default for BackoffPolicy {
  fn default() -> Self {
    Self {
      base:        Duration::from_secs(1),
      multiplier:  2.0,
      max:         Duration::from_secs(30),
      max_retries: 3,
    }
  }
}

impl BackoffPolicy {
  /// Delay before retry number `attempt` (0-indexed):
  /// `min(base * multiplier^attempt, max)`.
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let secs = self.base.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
    if !secs.is_finite() || secs >= self.max.as_secs_f64() {
      return self.max;
    }
    Duration::from_secs_f64(secs)
  }

  /// Like [`delay_for_attempt`](Self::delay_for_attempt), stretched to a
  /// provider wait hint. The hint never shortens the delay and is itself
  /// capped at `max`.
  pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
    let computed = self.delay_for_attempt(attempt);
    match hint {
      Some(hint) => computed.max(hint.min(self.max)),
      None => computed,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn policy() -> BackoffPolicy {
    BackoffPolicy {
      base:        Duration::from_secs(1),
      multiplier:  2.0,
      max:         Duration::from_secs(30),
      max_retries: 5,
    }
  }

  #[test]
  fn doubles_until_the_cap() {
    let p = policy();
    let delays: Vec<u64> = (0..8).map(|a| p.delay_for_attempt(a).as_secs()).collect();
    assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30]);
  }

  #[test]
  fn huge_attempts_saturate() {
    assert_eq!(policy().delay_for_attempt(u32::MAX), Duration::from_secs(30));
  }

  #[test]
  fn multiplier_below_one_is_treated_as_constant() {
    let p = BackoffPolicy { multiplier: 0.5, ..policy() };
    assert_eq!(p.delay_for_attempt(3), Duration::from_secs(1));
  }

  #[test]
  fn retry_after_only_lengthens() {
    let p = policy();
    assert_eq!(p.delay_for(0, Some(Duration::from_secs(10))), Duration::from_secs(10));
    assert_eq!(p.delay_for(3, Some(Duration::from_secs(2))), Duration::from_secs(8));
    assert_eq!(p.delay_for(0, Some(Duration::from_secs(600))), Duration::from_secs(30));
    assert_eq!(p.delay_for(1, None), Duration::from_secs(2));
  }
}
