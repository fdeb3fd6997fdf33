use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level_curve::Rank;

pub const STARTING_STAT_VALUE: u32 = 10;

/// Hunter attributes. Their sum drives the rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
  pub strength: u32,
  pub agility: u32,
  pub vitality: u32,
  pub intelligence: u32,
  pub perception: u32,
}

impl Default for PlayerStats {
  fn default() -> Self {
    Self {
      strength: STARTING_STAT_VALUE,
      agility: STARTING_STAT_VALUE,
      vitality: STARTING_STAT_VALUE,
      intelligence: STARTING_STAT_VALUE,
      perception: STARTING_STAT_VALUE,
    }
  }
}

impl PlayerStats {
  pub fn total(&self) -> u64 {
    [
      self.strength,
      self.agility,
      self.vitality,
      self.intelligence,
      self.perception,
    ]
    .iter()
    .map(|v| *v as u64)
    .sum()
  }

  pub fn get_mut(&mut self, kind: StatKind) -> &mut u32 {
    match kind {
      StatKind::Strength => &mut self.strength,
      StatKind::Agility => &mut self.agility,
      StatKind::Vitality => &mut self.vitality,
      StatKind::Intelligence => &mut self.intelligence,
      StatKind::Perception => &mut self.perception,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
  Strength,
  Agility,
  Vitality,
  Intelligence,
  Perception,
}

impl std::fmt::Display for StatKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Strength => write!(f, "strength"),
      Self::Agility => write!(f, "agility"),
      Self::Vitality => write!(f, "vitality"),
      Self::Intelligence => write!(f, "intelligence"),
      Self::Perception => write!(f, "perception"),
    }
  }
}

impl std::str::FromStr for StatKind {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "strength" | "str" => Ok(Self::Strength),
      "agility" | "agi" => Ok(Self::Agility),
      "vitality" | "vit" => Ok(Self::Vitality),
      "intelligence" | "int" => Ok(Self::Intelligence),
      "perception" | "per" => Ok(Self::Perception),
      _ => Err(format!("Unknown stat: {}", s)),
    }
  }
}

/// Player record owned by the progression facade.
/// `level` and `rank` are always derived from `total_xp` and `stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProgress {
  pub total_xp: u64,
  pub level: u32,
  pub stats: PlayerStats,
  pub unspent_stat_points: u32,
  pub rank: Rank,
}

impl Default for PlayerProgress {
  fn default() -> Self {
    let stats = PlayerStats::default();
    Self {
      total_xp: 0,
      level: 1,
      rank: Rank::for_total_stats(stats.total() as f64),
      stats,
      unspent_stat_points: 0,
    }
  }
}

/// One row of the XP ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpEvent {
  pub id: i64,
  pub amount: u64,
  pub reason: String,
  pub level_before: u32,
  pub level_after: u32,
  pub created_at: DateTime<Utc>,
}
