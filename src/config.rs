//! Runtime configuration
//!
//! Read from the environment (a `.env` file is loaded first by the binary).

use std::env;
use std::path::PathBuf;

const DB_FILE_NAME: &str = "hunter-log.db";
const APP_DIR_NAME: &str = "hunter-log";

const DEFAULT_SAVE_ATTEMPTS: u32 = 3;
const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value}")]
  Invalid { key: String, value: String },

  #[error("Could not determine a data directory; set HUNTER_LOG_DB")]
  NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
  pub database_path: PathBuf,
  /// Grant the daily reward on the very first activation too
  pub reward_first_day: bool,
  /// Attempts per streak save before the check gives up
  pub save_attempts: u32,
  pub check_interval_minutes: u64,
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let database_path = match env::var("HUNTER_LOG_DB") {
      Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
      _ => default_db_path()?,
    };

    let reward_first_day = match env::var("HUNTER_LOG_REWARD_FIRST_DAY") {
      Ok(value) => parse_bool("HUNTER_LOG_REWARD_FIRST_DAY", &value)?,
      Err(_) => false,
    };

    let save_attempts = parse_positive("HUNTER_LOG_SAVE_ATTEMPTS", DEFAULT_SAVE_ATTEMPTS as u64)? as u32;
    let check_interval_minutes =
      parse_positive("HUNTER_LOG_CHECK_INTERVAL_MINUTES", DEFAULT_CHECK_INTERVAL_MINUTES)?;

    Ok(Self {
      database_path,
      reward_first_day,
      save_attempts,
      check_interval_minutes,
    })
  }
}

/// <data dir>/hunter-log/hunter-log.db
fn default_db_path() -> Result<PathBuf, ConfigError> {
  let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
  Ok(data_dir.join(APP_DIR_NAME).join(DB_FILE_NAME))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => Err(ConfigError::Invalid {
      key: key.to_string(),
      value: value.to_string(),
    }),
  }
}

fn parse_positive(key: &str, default: u64) -> Result<u64, ConfigError> {
  let Ok(raw) = env::var(key) else {
    return Ok(default);
  };

  match raw.trim().parse::<u64>() {
    Ok(value) if (1..=u32::MAX as u64).contains(&value) => Ok(value),
    _ => Err(ConfigError::Invalid {
      key: key.to_string(),
      value: raw,
    }),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
