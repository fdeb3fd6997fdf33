use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::achievements::StreakAchievements;
use crate::config::AppConfig;
use crate::notify::SqliteNotifier;
use crate::progression::SqliteProgression;
use crate::store::SqliteStreakStore;
use crate::streak::{EngineSettings, StreakEngine};

pub type DbPool = SqlitePool;

/// Application state holding the database connection pool and the engine wired to it
pub struct AppState {
  pub db: DbPool,
  pub engine: StreakEngine,
}

impl AppState {
  /// Wire the streak engine to SQLite-backed collaborators
  pub fn new(db: DbPool, config: &AppConfig) -> Self {
    let settings = EngineSettings {
      reward_first_day: config.reward_first_day,
      save_attempts: config.save_attempts,
      ..Default::default()
    };

    let engine = StreakEngine::new(
      Arc::new(SqliteStreakStore::new(db.clone())),
      Arc::new(SqliteProgression::new(db.clone())),
      Arc::new(SqliteNotifier::new(db.clone())),
      settings,
    )
    .with_achievements(Arc::new(StreakAchievements::new(db.clone())));

    Self { db, engine }
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(db_path: &Path) -> Result<DbPool, Box<dyn std::error::Error>> {
  if let Some(parent) = db_path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }

  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

  tracing::info!(path = %db_path.display(), "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::debug!("Database migrations applied");

  Ok(pool)
}
