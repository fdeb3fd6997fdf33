//! Commands for player progression (XP, level, stats, rank)

use serde::Serialize;

use crate::db::AppState;
use crate::level_curve::{level_progress, LevelProgress, Rank};
use crate::models::{PlayerProgress, StatKind, XpEvent};
use crate::progression::{allocate_stat, apply_xp, load_progress, load_xp_history, LevelUp};

#[derive(Debug, Serialize)]
pub struct PlayerOverview {
    pub progress: PlayerProgress,
    pub level_progress: LevelProgress,
    pub stat_total: u64,
}

/// Get the player's XP, level, stats and rank
pub async fn get_player(state: &AppState) -> Result<PlayerOverview, String> {
    let progress = load_progress(&state.db).await.map_err(|e| e.to_string())?;
    Ok(PlayerOverview {
        level_progress: level_progress(progress.total_xp),
        stat_total: progress.stats.total(),
        progress,
    })
}

/// Grant XP for something outside the streak (quest, journal entry)
pub async fn grant_xp(state: &AppState, amount: u64, reason: String) -> Result<LevelUp, String> {
    if reason.trim().is_empty() {
        return Err("A reason is required for XP grants".to_string());
    }
    apply_xp(&state.db, amount, &reason).await.map_err(|e| e.to_string())
}

/// Spend unspent stat points
pub async fn allocate_stat_points(
    state: &AppState,
    stat_name: String,
    points: u32,
) -> Result<PlayerProgress, String> {
    let stat: StatKind = stat_name.parse()?;
    allocate_stat(&state.db, stat, points)
        .await
        .map_err(|e| e.to_string())
}

/// Most recent XP grants
pub async fn get_xp_history(state: &AppState, limit: i64) -> Result<Vec<XpEvent>, String> {
    load_xp_history(&state.db, limit).await.map_err(|e| e.to_string())
}

/// Rank a stat total would map to
pub fn rank_for_stats(stat_total: f64) -> Rank {
    Rank::for_total_stats(stat_total)
}
