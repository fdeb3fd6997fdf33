pub mod achievements;
pub mod commands;
pub mod config;
pub mod db;
pub mod level_curve;
pub mod models;
pub mod notify;
pub mod progression;
pub mod scheduler;
pub mod store;
pub mod streak;

#[cfg(test)]
mod test_utils;

use config::AppConfig;
use db::AppState;

/// Open (or create) the database and wire the engine to it
pub async fn init_state(config: &AppConfig) -> Result<AppState, Box<dyn std::error::Error>> {
  let pool = db::initialize_db(&config.database_path).await?;
  tracing::info!(
    reward_first_day = config.reward_first_day,
    save_attempts = config.save_attempts,
    "Database ready"
  );
  Ok(AppState::new(pool, config))
}
