//! Player Progression Engine
//!
//! The "game engine" side of the hunter log. Holds the player's XP, level,
//! stats and rank:
//! - XP only ever grows; level is re-derived from total XP on every grant
//! - each level gained awards stat points the player allocates freely
//! - rank is re-derived from the stat total whenever stats change
//! - every grant is written to the XP ledger together with the new totals

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::level_curve::{level_from_total_xp, Rank};
use crate::models::{PlayerProgress, PlayerStats, StatKind, XpEvent};

pub const STAT_POINTS_PER_LEVEL: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressionError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not enough stat points: requested {requested}, available {available}")]
    NotEnoughPoints { requested: u32, available: u32 },

    #[error("Corrupt player record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for ProgressionError {
    fn from(e: sqlx::Error) -> Self {
        ProgressionError::Database(e.to_string())
    }
}

// ---------------------------------------------------------------------------
/// Grant Result: What one XP grant did to the player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUp {
    pub xp_granted: u64,
    pub total_xp: u64,
    pub level_before: u32,
    pub level_after: u32,
    pub stat_points_awarded: u32,
    pub rank: Rank,
}

impl LevelUp {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

#[async_trait]
pub trait ProgressionFacade: Send + Sync {
    async fn add_xp(&self, amount: u64, reason: &str) -> Result<LevelUp, ProgressionError>;
}

// ---------------------------------------------------------------------------
/// Pure state changes
// ---------------------------------------------------------------------------

/// Apply an XP grant to `progress`, re-deriving level and awarding stat points
pub fn grant_xp(progress: &PlayerProgress, amount: u64) -> (PlayerProgress, LevelUp) {
    let total_xp = progress.total_xp.saturating_add(amount);
    let level_after = level_from_total_xp(total_xp);
    let levels_gained = level_after.saturating_sub(progress.level);
    let stat_points_awarded = levels_gained.saturating_mul(STAT_POINTS_PER_LEVEL);

    let next = PlayerProgress {
        total_xp,
        level: level_after.max(progress.level),
        stats: progress.stats,
        unspent_stat_points: progress.unspent_stat_points.saturating_add(stat_points_awarded),
        rank: progress.rank,
    };

    let summary = LevelUp {
        xp_granted: amount,
        total_xp,
        level_before: progress.level,
        level_after: next.level,
        stat_points_awarded,
        rank: next.rank,
    };

    (next, summary)
}

/// Spend unspent points on one stat and re-derive the rank
pub fn spend_stat_points(
    progress: &PlayerProgress,
    stat: StatKind,
    points: u32,
) -> Result<PlayerProgress, ProgressionError> {
    if points > progress.unspent_stat_points {
        return Err(ProgressionError::NotEnoughPoints {
            requested: points,
            available: progress.unspent_stat_points,
        });
    }

    let mut next = progress.clone();
    let value = next.stats.get_mut(stat);
    *value = value.saturating_add(points);
    next.unspent_stat_points -= points;
    next.rank = Rank::for_total_stats(next.stats.total() as f64);
    Ok(next)
}

// ---------------------------------------------------------------------------
// Database Operations
// ---------------------------------------------------------------------------

fn to_u32(value: i64, column: &str) -> Result<u32, ProgressionError> {
    u32::try_from(value)
        .map_err(|_| ProgressionError::Corrupt(format!("{} out of range: {}", column, value)))
}

fn to_u64(value: i64, column: &str) -> Result<u64, ProgressionError> {
    u64::try_from(value)
        .map_err(|_| ProgressionError::Corrupt(format!("{} out of range: {}", column, value)))
}

fn to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Load the player record, or defaults if none has been written yet
pub async fn load_progress(pool: &SqlitePool) -> Result<PlayerProgress, ProgressionError> {
    fetch_progress(pool).await
}

async fn fetch_progress<'e, E>(executor: E) -> Result<PlayerProgress, ProgressionError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT
            total_xp, level, strength, agility, vitality,
            intelligence, perception, unspent_stat_points
        FROM player_progress
        WHERE id = 1
        "#,
    )
    .fetch_optional(executor)
    .await?;

    let Some(row) = row else {
        return Ok(PlayerProgress::default());
    };

    let stats = PlayerStats {
        strength: to_u32(row.get("strength"), "strength")?,
        agility: to_u32(row.get("agility"), "agility")?,
        vitality: to_u32(row.get("vitality"), "vitality")?,
        intelligence: to_u32(row.get("intelligence"), "intelligence")?,
        perception: to_u32(row.get("perception"), "perception")?,
    };
    let total_xp = to_u64(row.get("total_xp"), "total_xp")?;
    let stored_level = to_u32(row.get("level"), "level")?;

    Ok(PlayerProgress {
        total_xp,
        // Derived values win over whatever was stored
        level: stored_level.max(level_from_total_xp(total_xp)),
        rank: Rank::for_total_stats(stats.total() as f64),
        stats,
        unspent_stat_points: to_u32(row.get("unspent_stat_points"), "unspent_stat_points")?,
    })
}

async fn save_progress<'e, E>(executor: E, progress: &PlayerProgress) -> Result<(), ProgressionError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO player_progress (
            id, total_xp, level, strength, agility, vitality,
            intelligence, perception, unspent_stat_points, rank, updated_at
        )
        VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, CURRENT_TIMESTAMP)
        ON CONFLICT(id) DO UPDATE SET
            total_xp = excluded.total_xp,
            level = excluded.level,
            strength = excluded.strength,
            agility = excluded.agility,
            vitality = excluded.vitality,
            intelligence = excluded.intelligence,
            perception = excluded.perception,
            unspent_stat_points = excluded.unspent_stat_points,
            rank = excluded.rank,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(to_db(progress.total_xp))
    .bind(progress.level as i64)
    .bind(progress.stats.strength as i64)
    .bind(progress.stats.agility as i64)
    .bind(progress.stats.vitality as i64)
    .bind(progress.stats.intelligence as i64)
    .bind(progress.stats.perception as i64)
    .bind(progress.unspent_stat_points as i64)
    .bind(progress.rank.to_string())
    .execute(executor)
    .await?;

    Ok(())
}

/// Most recent XP grants first
pub async fn load_xp_history(pool: &SqlitePool, limit: i64) -> Result<Vec<XpEvent>, ProgressionError> {
    let rows = sqlx::query(
        r#"
        SELECT id, amount, reason, level_before, level_after, created_at
        FROM xp_history
        ORDER BY id DESC
        LIMIT ?1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        events.push(XpEvent {
            id: row.get("id"),
            amount: to_u64(row.get("amount"), "amount")?,
            reason: row.get("reason"),
            level_before: to_u32(row.get("level_before"), "level_before")?,
            level_after: to_u32(row.get("level_after"), "level_after")?,
            created_at,
        });
    }

    Ok(events)
}

// ---------------------------------------------------------------------------
// Progression Actions
// ---------------------------------------------------------------------------

/// Grant XP and record it in the ledger, atomically
pub async fn apply_xp(pool: &SqlitePool, amount: u64, reason: &str) -> Result<LevelUp, ProgressionError> {
    let mut tx = pool.begin().await?;

    let current = fetch_progress(&mut *tx).await?;
    let (next, summary) = grant_xp(&current, amount);

    save_progress(&mut *tx, &next).await?;
    sqlx::query(
        r#"
        INSERT INTO xp_history (amount, reason, level_before, level_after, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(to_db(amount))
    .bind(reason)
    .bind(summary.level_before as i64)
    .bind(summary.level_after as i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if summary.leveled_up() {
        tracing::info!(
            level_before = summary.level_before,
            level_after = summary.level_after,
            total_xp = summary.total_xp,
            "Level up"
        );
    } else {
        tracing::debug!(amount, reason, total_xp = summary.total_xp, "XP granted");
    }

    Ok(summary)
}

fn stat_column(stat: StatKind) -> &'static str {
    match stat {
        StatKind::Strength => "strength",
        StatKind::Agility => "agility",
        StatKind::Vitality => "vitality",
        StatKind::Intelligence => "intelligence",
        StatKind::Perception => "perception",
    }
}

/// Spend stat points on one attribute.
///
/// Only the stat column and the unspent points are written, guarded on the
/// points still being available, so XP granted concurrently is never
/// overwritten.
pub async fn allocate_stat(
    pool: &SqlitePool,
    stat: StatKind,
    points: u32,
) -> Result<PlayerProgress, ProgressionError> {
    let mut tx = pool.begin().await?;

    let column = stat_column(stat);
    let spend = format!(
        r#"
        UPDATE player_progress
        SET {column} = MIN({column} + ?1, 4294967295),
            unspent_stat_points = unspent_stat_points - ?1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = 1 AND unspent_stat_points >= ?1
        "#
    );
    let result = sqlx::query(&spend)
        .bind(points as i64)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        // Nothing written: report why from the current record
        let current = fetch_progress(&mut *tx).await?;
        return spend_stat_points(&current, stat, points);
    }

    let next = fetch_progress(&mut *tx).await?;
    sqlx::query("UPDATE player_progress SET rank = ?1 WHERE id = 1")
        .bind(next.rank.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let previous_rank = Rank::for_total_stats(next.stats.total().saturating_sub(points as u64) as f64);
    if next.rank != previous_rank {
        tracing::info!(from = %previous_rank, to = %next.rank, "Rank changed");
    }
    tracing::debug!(stat = %stat, points, "Stat points allocated");

    Ok(next)
}

/// SQLite-backed progression facade handed to the streak engine
#[derive(Debug, Clone)]
pub struct SqliteProgression {
    pool: SqlitePool,
}

impl SqliteProgression {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressionFacade for SqliteProgression {
    async fn add_xp(&self, amount: u64, reason: &str) -> Result<LevelUp, ProgressionError> {
        apply_xp(&self.pool, amount, reason).await
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
