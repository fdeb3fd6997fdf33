//! User-visible notifications
//!
//! Fire-and-forget toasts. The engine never lets a notifier failure affect a
//! streak transition; callers log and move on.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::Notification;

pub const CATEGORY_STREAK: &str = "streak";
pub const CATEGORY_REWARD: &str = "reward";
pub const CATEGORY_ACHIEVEMENT: &str = "achievement";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
  #[error("Database error: {0}")]
  Database(String),

  #[error("Notifier unavailable: {0}")]
  Unavailable(String),
}

impl From<sqlx::Error> for NotifyError {
  fn from(e: sqlx::Error) -> Self {
    NotifyError::Database(e.to_string())
  }
}

#[async_trait]
pub trait Notifier: Send + Sync {
  async fn notify(&self, title: &str, message: &str, category: &str) -> Result<(), NotifyError>;
}

/// ---------------------------------------------------------------------------
/// SQLite-backed notifier (the front end polls the table for toasts)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SqliteNotifier {
  pool: SqlitePool,
}

impl SqliteNotifier {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl Notifier for SqliteNotifier {
  async fn notify(&self, title: &str, message: &str, category: &str) -> Result<(), NotifyError> {
    sqlx::query(
      r#"
      INSERT INTO notifications (title, message, category, read, created_at)
      VALUES (?1, ?2, ?3, 0, ?4)
      "#,
    )
    .bind(title)
    .bind(message)
    .bind(category)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    tracing::debug!(category, title, "Notification stored");
    Ok(())
  }
}

/// Most recent notifications first
pub async fn recent_notifications(pool: &SqlitePool, limit: i64) -> Result<Vec<Notification>, NotifyError> {
  let rows = sqlx::query_as::<_, Notification>(
    "SELECT id, title, message, category, read, created_at FROM notifications ORDER BY id DESC LIMIT ?1",
  )
  .bind(limit)
  .fetch_all(pool)
  .await?;

  Ok(rows)
}

/// Mark every unread notification as read. Returns how many changed.
pub async fn mark_notifications_read(pool: &SqlitePool) -> Result<u64, NotifyError> {
  let result = sqlx::query("UPDATE notifications SET read = 1 WHERE read = 0")
    .execute(pool)
    .await?;

  Ok(result.rows_affected())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
