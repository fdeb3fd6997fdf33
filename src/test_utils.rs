//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Date/time factories
//! - Recording and failing collaborators for the streak engine

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::achievements::{AchievementChecker, AchievementError};
use crate::level_curve::Rank;
use crate::models::{Achievement, StreakState};
use crate::notify::{Notifier, NotifyError};
use crate::progression::{LevelUp, ProgressionError, ProgressionFacade};
use crate::store::{StoreError, StreakStore};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// UTC timestamp on the given day at `hour`:00
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(year, month, day, hour, 0, 0)
    .single()
    .expect("valid test timestamp")
}

/// ---------------------------------------------------------------------------
/// Notifier Doubles
/// ---------------------------------------------------------------------------

/// Remembers every (title, message, category)
#[derive(Debug, Default)]
pub struct RecordingNotifier {
  sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingNotifier {
  pub fn titles(&self) -> Vec<String> {
    self.sent.lock().unwrap().iter().map(|(t, _, _)| t.clone()).collect()
  }

  /// (title, message) pairs sent under `category`
  pub fn with_category(&self, category: &str) -> Vec<(String, String)> {
    self
      .sent
      .lock()
      .unwrap()
      .iter()
      .filter(|(_, _, c)| c == category)
      .map(|(t, m, _)| (t.clone(), m.clone()))
      .collect()
  }
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn notify(&self, title: &str, message: &str, category: &str) -> Result<(), NotifyError> {
    self
      .sent
      .lock()
      .unwrap()
      .push((title.to_string(), message.to_string(), category.to_string()));
    Ok(())
  }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
  async fn notify(&self, _title: &str, _message: &str, _category: &str) -> Result<(), NotifyError> {
    Err(NotifyError::Unavailable("toast layer offline".into()))
  }
}

/// ---------------------------------------------------------------------------
/// Progression Doubles
/// ---------------------------------------------------------------------------

/// Records granted amounts; fails the first `failures` grants
#[derive(Debug, Default)]
pub struct RecordingProgression {
  grants: Mutex<Vec<u64>>,
  remaining_failures: AtomicU32,
}

impl RecordingProgression {
  pub fn failing() -> Self {
    Self::failing_times(u32::MAX)
  }

  pub fn failing_times(failures: u32) -> Self {
    Self {
      grants: Mutex::new(Vec::new()),
      remaining_failures: AtomicU32::new(failures),
    }
  }

  pub fn grants(&self) -> Vec<u64> {
    self.grants.lock().unwrap().clone()
  }
}

#[async_trait]
impl ProgressionFacade for RecordingProgression {
  async fn add_xp(&self, amount: u64, _reason: &str) -> Result<LevelUp, ProgressionError> {
    let failing = self
      .remaining_failures
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if failing {
      return Err(ProgressionError::Database("database is locked".into()));
    }

    let mut grants = self.grants.lock().unwrap();
    grants.push(amount);
    let total_xp: u64 = grants.iter().sum();
    Ok(LevelUp {
      xp_granted: amount,
      total_xp,
      level_before: 1,
      level_after: 1,
      stat_points_awarded: 0,
      rank: Rank::E,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Achievement Doubles
/// ---------------------------------------------------------------------------

pub struct FailingAchievements;

#[async_trait]
impl AchievementChecker for FailingAchievements {
  async fn check_streak(&self, _state: &StreakState) -> Result<Vec<Achievement>, AchievementError> {
    Err(AchievementError::Database("achievements table missing".into()))
  }
}

/// ---------------------------------------------------------------------------
/// Store Doubles
/// ---------------------------------------------------------------------------

/// Fails the first `failures` saves with a database error
pub struct FlakyStore<S> {
  inner: S,
  remaining_failures: AtomicU32,
}

impl<S: StreakStore> FlakyStore<S> {
  pub fn new(inner: S, failures: u32) -> Self {
    Self {
      inner,
      remaining_failures: AtomicU32::new(failures),
    }
  }

  pub fn heal(&self) {
    self.remaining_failures.store(0, Ordering::SeqCst);
  }
}

#[async_trait]
impl<S: StreakStore> StreakStore for FlakyStore<S> {
  async fn load(&self) -> Result<Option<StreakState>, StoreError> {
    self.inner.load().await
  }

  async fn save(&self, state: &StreakState) -> Result<i64, StoreError> {
    let failing = self
      .remaining_failures
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if failing {
      return Err(StoreError::Database("disk I/O error".into()));
    }
    self.inner.save(state).await
  }
}

/// Simulates another session committing the same transition just before
/// our first save lands
pub struct RacingStore<S> {
  inner: S,
  raced: AtomicBool,
}

impl<S: StreakStore> RacingStore<S> {
  pub fn new(inner: S) -> Self {
    Self {
      inner,
      raced: AtomicBool::new(false),
    }
  }
}

#[async_trait]
impl<S: StreakStore> StreakStore for RacingStore<S> {
  async fn load(&self) -> Result<Option<StreakState>, StoreError> {
    self.inner.load().await
  }

  async fn save(&self, state: &StreakState) -> Result<i64, StoreError> {
    if !self.raced.swap(true, Ordering::SeqCst) {
      self.inner.save(state).await?;
    }
    self.inner.save(state).await
  }
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('streak_state', 'player_progress', 'xp_history', 'notifications', 'achievements')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 5, "Expected 5 tables, got {:?}", tables);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_time_helpers() {
    let day = date(2026, 2, 28);
    assert_eq!(at(2026, 2, 28, 13).date_naive(), day);
    assert_eq!(day.succ_opt(), Some(date(2026, 3, 1)));
  }
}
