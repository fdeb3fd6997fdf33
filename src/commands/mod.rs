pub mod progression;
pub mod streak;

use crate::achievements::load_achievements;
use crate::db::AppState;
use crate::models::{Achievement, Notification};
use crate::notify::{mark_notifications_read, recent_notifications};

pub async fn get_notifications(state: &AppState, limit: i64) -> Result<Vec<Notification>, String> {
  recent_notifications(&state.db, limit)
    .await
    .map_err(|e| format!("Failed to fetch notifications: {}", e))
}

pub async fn mark_all_notifications_read(state: &AppState) -> Result<u64, String> {
  mark_notifications_read(&state.db)
    .await
    .map_err(|e| format!("Failed to mark notifications read: {}", e))
}

pub async fn get_achievements(state: &AppState) -> Result<Vec<Achievement>, String> {
  load_achievements(&state.db)
    .await
    .map_err(|e| format!("Failed to fetch achievements: {}", e))
}
