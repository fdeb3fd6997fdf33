use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
  pub id: i64,
  pub title: String,
  pub message: String,
  pub category: String,
  pub read: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Achievement {
  pub id: String,
  pub name: String,
  pub description: String,
  pub unlocked_at: DateTime<Utc>,
}
