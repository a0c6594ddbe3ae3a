//! Global request spacing, per-attempt timeouts and retry with backoff.

use std::{future::Future, time::Duration};

use hoopsync_core::FetchError;
use tokio::{sync::Mutex, time::Instant};
use tracing::warn;

use crate::backoff::BackoffPolicy;

/// Gate for every provider call in a run.
///
/// Spacing is global: all workers sharing one limiter queue on the same slot,
/// so at most one request starts per `spacing` interval no matter how many
/// fetches are in flight.
#[derive(Debug)]
pub struct RateLimiter {
  spacing:   Duration,
  timeout:   Duration,
  backoff:   BackoffPolicy,
  next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
  pub fn new(spacing: Duration, timeout: Duration, backoff: BackoffPolicy) -> Self {
    Self { spacing, timeout, backoff, next_slot: Mutex::new(None) }
  }

  pub fn backoff(&self) -> &BackoffPolicy { &self.backoff }

  /// Wait until this caller may start a request and claim the slot after it.
  async fn wait_turn(&self) {
    // Held across the sleep so waiters are released one spacing apart.
    let mut next = self.next_slot.lock().await;
    if let Some(at) = *next {
      tokio::time::sleep_until(at).await;
    }
    *next = Some(Instant::now() + self.spacing);
  }

  /// Run one logical fetch.
  ///
  /// Each attempt waits for its slot and is bounded by the timeout.
  /// Transient failures are retried per the backoff policy and end in
  /// [`FetchError::Exhausted`]; permanent failures are returned at once.
  pub async fn execute<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, FetchError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
  {
    let mut attempt = 0;
    loop {
      self.wait_turn().await;

      let result = tokio::time::timeout(self.timeout, operation())
        .await
        .unwrap_or(Err(FetchError::Timeout));

      let error = match result {
        Ok(value) => return Ok(value),
        Err(e) if !e.is_transient() => return Err(e),
        Err(e) => e,
      };

      if attempt >= self.backoff.max_retries {
        return Err(FetchError::Exhausted { attempts: attempt + 1, last: Box::new(error) });
      }

      let delay = self.backoff.delay_for(attempt, error.retry_after());
      warn!(
        what,
        attempt = attempt + 1,
        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        error = %error,
        "transient fetch failure, retrying"
      );
      tokio::time::sleep(delay).await;
      attempt += 1;
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
  };

  use super::*;

  fn limiter(spacing_ms: u64, max_retries: u32) -> RateLimiter {
    RateLimiter::new(
      Duration::from_millis(spacing_ms),
      Duration::from_secs(20),
      BackoffPolicy {
        base: Duration::from_secs(1),
        multiplier: 2.0,
        max: Duration::from_secs(30),
        max_retries,
      },
    )
  }

  /// An operation that fails transiently `failures` times, then succeeds.
  fn flaky(
    failures: u32,
    calls: Arc<AtomicU32>,
  ) -> impl FnMut() -> std::future::Ready<Result<u32, FetchError>> {
    move || {
      let n = calls.fetch_add(1, Ordering::SeqCst);
      std::future::ready(if n < failures { Err(FetchError::Server(503)) } else { Ok(n) })
    }
  }

  #[tokio::test(start_paused = true)]
  async fn retries_follow_the_backoff_schedule() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let got = limiter(0, 5).execute("test", flaky(5, calls.clone())).await;

    assert_eq!(got, Ok(5));
    assert_eq!(calls.load(Ordering::SeqCst), 6);
    // 1 + 2 + 4 + 8 + 16 seconds of backoff.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(31), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(32), "{elapsed:?}");
  }

  #[tokio::test(start_paused = true)]
  async fn exhausted_retries_report_the_last_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let got = limiter(0, 2).execute("test", flaky(10, calls.clone())).await;

    assert_eq!(
      got,
      Err(FetchError::Exhausted { attempts: 3, last: Box::new(FetchError::Server(503)) })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn permanent_errors_are_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let got: Result<(), _> = limiter(0, 5)
      .execute("test", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Err(FetchError::NotFound("event 1".into())))
      })
      .await;

    assert_eq!(got, Err(FetchError::NotFound("event 1".into())));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn slow_attempts_time_out() {
    let got: Result<(), _> = limiter(0, 0)
      .execute("test", || async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
      })
      .await;

    assert_eq!(
      got,
      Err(FetchError::Exhausted { attempts: 1, last: Box::new(FetchError::Timeout) })
    );
  }

  #[tokio::test(start_paused = true)]
  async fn retry_after_stretches_the_delay() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let start = Instant::now();

    let got = limiter(0, 3)
      .execute("test", move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(if n == 0 {
          Err(FetchError::RateLimited { retry_after: Some(Duration::from_secs(10)) })
        } else {
          Ok(n)
        })
      })
      .await;

    assert_eq!(got, Ok(1));
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert!(start.elapsed() < Duration::from_secs(11));
  }

  #[tokio::test(start_paused = true)]
  async fn calls_are_spaced_globally() {
    let shared = Arc::new(limiter(1500, 0));
    let start = Instant::now();

    let mut tasks = Vec::new();
    for i in 0..3u32 {
      let limiter = shared.clone();
      tasks.push(tokio::spawn(async move {
        limiter
          .execute("test", || std::future::ready(Ok::<_, FetchError>(i)))
          .await
      }));
    }
    for task in tasks {
      assert!(task.await.unwrap().is_ok());
    }

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(3000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3100), "{elapsed:?}");
  }
}
