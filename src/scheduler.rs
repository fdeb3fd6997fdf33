//! Periodic streak checks
//!
//! One check at startup, then one per interval until shutdown. A failed check
//! is logged and retried on the next tick.

use std::future::Future;
use std::time::Duration;

use chrono::Local;

use crate::db::AppState;
use crate::streak::{StreakError, StreakUpdate};

/// Run one check now, logging the outcome
pub async fn run_check(state: &AppState) -> Result<StreakUpdate, StreakError> {
  match state.engine.mark_activity(&Local::now()).await {
    Ok(update) => {
      tracing::info!(
        transition = ?update.transition,
        current_streak = update.state.current_streak,
        reward = update.reward,
        "Streak check complete"
      );
      Ok(update)
    }
    Err(e) => {
      tracing::error!(error = %e, "Streak check failed; will retry on next tick");
      Err(e)
    }
  }
}

/// Check at startup and every `interval` until `shutdown` resolves.
/// Returns the number of checks that ran.
pub async fn watch<F>(state: &AppState, interval: Duration, shutdown: F) -> u64
where
  F: Future<Output = ()>,
{
  let mut ticker = tokio::time::interval(interval);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
  tokio::pin!(shutdown);

  let mut checks = 0;
  loop {
    tokio::select! {
      _ = &mut shutdown => {
        tracing::info!(checks, "Streak watcher stopping");
        return checks;
      }
      // First tick fires immediately: the startup check
      _ = ticker.tick() => {
        let _ = run_check(state).await;
        checks += 1;
      }
    }
  }
}
