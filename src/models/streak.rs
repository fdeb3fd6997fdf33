use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted daily streak record.
///
/// `version` is 0 until the record has been saved once; every committed save
/// bumps it by one. `pending_reward` is XP earned by a committed day that has
/// not been credited to the player yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
  pub current_streak: u32,
  pub longest_streak: u32,
  pub last_activity_date: Option<NaiveDate>,
  pub total_days_active: u32,
  pub streak_start_date: Option<NaiveDate>,
  #[serde(default)]
  pub pending_reward: u64,
  #[serde(default)]
  pub version: i64,
}
