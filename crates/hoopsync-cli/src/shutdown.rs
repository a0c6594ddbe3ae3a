//! Cooperative cancellation on SIGINT / SIGTERM.
//!
//! The first signal cancels the returned token: the engine stops starting
//! new candidates, lets in-flight fetches finish, merges them and records
//! the run as partially completed. A second signal exits immediately.

use std::sync::{
  Arc,
  atomic::{AtomicU32, Ordering},
};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub fn install_signal_handler() -> CancellationToken {
  let token = CancellationToken::new();
  let count = Arc::new(AtomicU32::new(0));

  let handler_token = token.clone();
  tokio::spawn(async move {
    #[cfg(unix)]
    let mut sigterm = {
      use tokio::signal::unix::{SignalKind, signal};
      match signal(SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
          error!(error = %e, "could not register SIGTERM handler");
          None
        }
      }
    };

    loop {
      #[cfg(unix)]
      {
        let term = async {
          match sigterm.as_mut() {
            Some(s) => {
              s.recv().await;
            }
            None => std::future::pending::<()>().await,
          }
        };
        tokio::select! {
          _ = tokio::signal::ctrl_c() => {}
          _ = term => {}
        }
      }

      #[cfg(not(unix))]
      if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "could not listen for Ctrl+C");
        return;
      }

      if count.fetch_add(1, Ordering::SeqCst) == 0 {
        info!("shutdown requested, finishing in-flight fetches (signal again to force exit)");
        handler_token.cancel();
      } else {
        warn!("forced exit");
        std::process::exit(130);
      }
    }
  });

  token
}
