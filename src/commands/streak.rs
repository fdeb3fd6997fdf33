//! Commands for the daily streak engine

use chrono::Local;
use serde::Serialize;

use crate::db::AppState;
use crate::models::StreakState;
use crate::streak::{daily_reward, StreakStatus, StreakUpdate};

/// Record activity now (quest completed, journal entry saved, startup check)
pub async fn record_activity(state: &AppState) -> Result<StreakUpdate, String> {
    state
        .engine
        .mark_activity(&Local::now())
        .await
        .map_err(|e| e.to_string())
}

#[derive(Debug, Serialize)]
pub struct StreakOverview {
    pub state: StreakState,
    pub status: StreakStatus,
    /// What tomorrow's first activity would pay if the streak holds
    pub next_reward: u64,
}

/// Current streak plus whether it is at risk today
pub async fn get_streak(state: &AppState) -> Result<StreakOverview, String> {
    let today = Local::now().date_naive();
    let streak = state.engine.current_state().await.map_err(|e| e.to_string())?;
    let status = crate::streak::streak_status(&streak, today);

    let next_reward = match status {
        StreakStatus::ActiveToday | StreakStatus::StreakAlive => daily_reward(streak.current_streak.saturating_add(1)),
        StreakStatus::StreakLapsed => daily_reward(1),
        StreakStatus::Uninitialized if state.engine.settings().reward_first_day => daily_reward(1),
        StreakStatus::Uninitialized => 0,
    };

    Ok(StreakOverview {
        state: streak,
        status,
        next_reward,
    })
}

/// Reward a streak of `streak_days` would earn
pub fn preview_reward(streak_days: u32) -> u64 {
    daily_reward(streak_days)
}
