//! Streak milestone achievements
//!
//! Checked after every committed streak transition. Unlocks are idempotent:
//! an achievement already in the table is never reported twice.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{Achievement, StreakState};

#[derive(Debug, thiserror::Error)]
pub enum AchievementError {
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for AchievementError {
    fn from(e: sqlx::Error) -> Self {
        AchievementError::Database(e.to_string())
    }
}

#[async_trait]
pub trait AchievementChecker: Send + Sync {
    /// Returns the achievements newly unlocked by `state`
    async fn check_streak(&self, state: &StreakState) -> Result<Vec<Achievement>, AchievementError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    LongestStreak,
    TotalDaysActive,
}

struct Definition {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    metric: Metric,
    threshold: u32,
}

const DEFINITIONS: &[Definition] = &[
    Definition {
        id: "streak_3",
        name: "Awakened",
        description: "Kept a 3-day streak.",
        metric: Metric::LongestStreak,
        threshold: 3,
    },
    Definition {
        id: "streak_7",
        name: "Daily Quest Regular",
        description: "Kept a 7-day streak.",
        metric: Metric::LongestStreak,
        threshold: 7,
    },
    Definition {
        id: "streak_14",
        name: "Dungeon Diver",
        description: "Kept a 14-day streak.",
        metric: Metric::LongestStreak,
        threshold: 14,
    },
    Definition {
        id: "streak_30",
        name: "Gate Breaker",
        description: "Kept a 30-day streak.",
        metric: Metric::LongestStreak,
        threshold: 30,
    },
    Definition {
        id: "streak_60",
        name: "Raid Leader",
        description: "Kept a 60-day streak.",
        metric: Metric::LongestStreak,
        threshold: 60,
    },
    Definition {
        id: "streak_100",
        name: "Shadow Monarch",
        description: "Kept a 100-day streak.",
        metric: Metric::LongestStreak,
        threshold: 100,
    },
    Definition {
        id: "days_active_50",
        name: "Seasoned Hunter",
        description: "Logged activity on 50 different days.",
        metric: Metric::TotalDaysActive,
        threshold: 50,
    },
    Definition {
        id: "days_active_365",
        name: "A Year in the Gates",
        description: "Logged activity on 365 different days.",
        metric: Metric::TotalDaysActive,
        threshold: 365,
    },
];

fn earned(def: &Definition, state: &StreakState) -> bool {
    let value = match def.metric {
        Metric::LongestStreak => state.longest_streak,
        Metric::TotalDaysActive => state.total_days_active,
    };
    value >= def.threshold
}

/// Every achievement `state` qualifies for, in definition order
fn qualifying(state: &StreakState) -> impl Iterator<Item = &'static Definition> + '_ {
    DEFINITIONS.iter().filter(move |def| earned(def, state))
}

#[derive(Debug, Clone)]
pub struct StreakAchievements {
    pool: SqlitePool,
}

impl StreakAchievements {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AchievementChecker for StreakAchievements {
    async fn check_streak(&self, state: &StreakState) -> Result<Vec<Achievement>, AchievementError> {
        let mut unlocked = Vec::new();

        for def in qualifying(state) {
            let now = Utc::now();
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO achievements (id, name, description, unlocked_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(def.id)
            .bind(def.name)
            .bind(def.description)
            .bind(now)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() > 0 {
                tracing::info!(achievement = def.id, "Achievement unlocked");
                unlocked.push(Achievement {
                    id: def.id.to_string(),
                    name: def.name.to_string(),
                    description: def.description.to_string(),
                    unlocked_at: now,
                });
            }
        }

        Ok(unlocked)
    }
}

/// All unlocked achievements, oldest first
pub async fn load_achievements(pool: &SqlitePool) -> Result<Vec<Achievement>, AchievementError> {
    let rows = sqlx::query_as::<_, Achievement>(
        "SELECT id, name, description, unlocked_at FROM achievements ORDER BY unlocked_at, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
