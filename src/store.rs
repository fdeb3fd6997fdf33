//! Streak persistence
//!
//! The streak record is a single row. Saves are compare-and-swap on the
//! `version` column so two sessions sharing one database cannot both apply
//! an update for the same day.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};

use crate::models::StreakState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Version conflict: expected stored version {expected}")]
    Conflict { expected: i64 },

    #[error("Corrupt streak record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

#[async_trait]
pub trait StreakStore: Send + Sync {
    /// Stored record, or `None` before the first activity
    async fn load(&self) -> Result<Option<StreakState>, StoreError>;

    /// Commit `state` if the stored version still equals `state.version`.
    /// Returns the new version.
    async fn save(&self, state: &StreakState) -> Result<i64, StoreError>;
}

// ---------------------------------------------------------------------------
// SQLite store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SqliteStreakStore {
    pool: SqlitePool,
}

impl SqliteStreakStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn to_count(value: i64, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{} out of range: {}", column, value)))
}

#[async_trait]
impl StreakStore for SqliteStreakStore {
    async fn load(&self) -> Result<Option<StreakState>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                current_streak, longest_streak, last_activity_date,
                total_days_active, streak_start_date, pending_reward, version
            FROM streak_state
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let last_activity_date: Option<NaiveDate> = row.try_get("last_activity_date")?;
        let streak_start_date: Option<NaiveDate> = row.try_get("streak_start_date")?;

        Ok(Some(StreakState {
            current_streak: to_count(row.try_get("current_streak")?, "current_streak")?,
            longest_streak: to_count(row.try_get("longest_streak")?, "longest_streak")?,
            last_activity_date,
            total_days_active: to_count(row.try_get("total_days_active")?, "total_days_active")?,
            streak_start_date,
            pending_reward: u64::try_from(row.try_get::<i64, _>("pending_reward")?)
                .map_err(|_| StoreError::Corrupt("pending_reward is negative".into()))?,
            version: row.try_get("version")?,
        }))
    }

    async fn save(&self, state: &StreakState) -> Result<i64, StoreError> {
        let pending_reward = i64::try_from(state.pending_reward)
            .map_err(|_| StoreError::Corrupt(format!("pending_reward out of range: {}", state.pending_reward)))?;

        let result = if state.version == 0 {
            sqlx::query(
                r#"
                INSERT INTO streak_state (
                    id, current_streak, longest_streak, last_activity_date,
                    total_days_active, streak_start_date, pending_reward, version, updated_at
                )
                VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, 1, CURRENT_TIMESTAMP)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(state.current_streak as i64)
            .bind(state.longest_streak as i64)
            .bind(state.last_activity_date)
            .bind(state.total_days_active as i64)
            .bind(state.streak_start_date)
            .bind(pending_reward)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE streak_state
                SET current_streak = ?1,
                    longest_streak = ?2,
                    last_activity_date = ?3,
                    total_days_active = ?4,
                    streak_start_date = ?5,
                    pending_reward = ?6,
                    version = version + 1,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = 1 AND version = ?7
                "#,
            )
            .bind(state.current_streak as i64)
            .bind(state.longest_streak as i64)
            .bind(state.last_activity_date)
            .bind(state.total_days_active as i64)
            .bind(state.streak_start_date)
            .bind(pending_reward)
            .bind(state.version)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                expected: state.version,
            });
        }

        Ok(state.version + 1)
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
