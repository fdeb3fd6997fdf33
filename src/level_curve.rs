//! Level Curve
//!
//! Pure XP/level/rank math shared by the streak engine and the progression
//! facade:
//! - XP to advance from level L is floor(100 * 1.5^(L-1))
//! - cumulative XP to reach level L is the sum of the costs of levels 1..L-1
//! - rank is a fixed ladder over the player's total stats

use serde::{Deserialize, Serialize};

const BASE_LEVEL_XP: u64 = 100;

/// Growth ratio of the per-level cost is 3 / 2
const GROWTH_NUM: u128 = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelCurveError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

// ---------------------------------------------------------------------------
/// Level math
// ---------------------------------------------------------------------------

/// XP needed to go from `level` to `level + 1`.
pub fn xp_for_level(level: u32) -> Result<u64, LevelCurveError> {
    if level < 1 {
        return Err(LevelCurveError::InvalidArgument(format!(
            "level must be >= 1, got {}",
            level
        )));
    }
    Ok(level_cost(level - 1))
}

/// floor(100 * 1.5^k), exact for every k; saturates at `u64::MAX`
fn level_cost(k: u32) -> u64 {
    // 100 * 1.5^i == quotient + remainder / 2^i, with remainder < 2^i
    let mut quotient: u128 = BASE_LEVEL_XP as u128;
    let mut remainder: u128 = 0;

    for i in 0..k {
        let tripled = quotient * GROWTH_NUM;
        let numerator = ((tripled & 1) << i) + remainder * GROWTH_NUM;
        let carry = numerator >> (i + 1);
        remainder = numerator - (carry << (i + 1));
        quotient = (tripled >> 1) + carry;

        // Reached within ~100 steps, long before the shifts could overflow
        if quotient > u64::MAX as u128 {
            return u64::MAX;
        }
    }

    quotient as u64
}

/// Total XP needed to reach `level` from zero. Saturates at `u64::MAX`.
pub fn cumulative_xp_for_level(level: u32) -> Result<u64, LevelCurveError> {
    if level < 1 {
        return Err(LevelCurveError::InvalidArgument(format!(
            "level must be >= 1, got {}",
            level
        )));
    }

    let mut total: u64 = 0;
    for k in 0..(level - 1) {
        total = total.saturating_add(level_cost(k));
        if total == u64::MAX {
            break;
        }
    }
    Ok(total)
}

/// Largest level whose cumulative XP requirement is covered by `total_xp`.
pub fn level_from_total_xp(total_xp: u64) -> u32 {
    let mut level: u32 = 1;
    let mut reached: u64 = 0;

    loop {
        match reached.checked_add(level_cost(level - 1)) {
            Some(next) if next <= total_xp => {
                reached = next;
                level += 1;
            }
            _ => return level,
        }
    }
}

/// Where a player sits inside their current level, for progress bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    pub xp_into_level: u64,
    pub xp_for_next_level: u64,
}

pub fn level_progress(total_xp: u64) -> LevelProgress {
    let level = level_from_total_xp(total_xp);
    let floor = cumulative_xp_for_level(level).unwrap_or(0);
    LevelProgress {
        level,
        xp_into_level: total_xp - floor,
        xp_for_next_level: level_cost(level - 1),
    }
}

// ---------------------------------------------------------------------------
/// Rank ladder
// ---------------------------------------------------------------------------

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    E,
    D,
    C,
    B,
    A,
    S,
    SS,
    SSS,
}

/// Lower bound (inclusive) of each tier, highest first
const RANK_THRESHOLDS: [(f64, Rank); 7] = [
    (1000.0, Rank::SSS),
    (750.0, Rank::SS),
    (500.0, Rank::S),
    (350.0, Rank::A),
    (250.0, Rank::B),
    (150.0, Rank::C),
    (75.0, Rank::D),
];

impl Rank {
    /// Boundary values belong to the higher tier. Negative and NaN totals are E.
    pub fn for_total_stats(stats: f64) -> Self {
        RANK_THRESHOLDS
            .iter()
            .find(|(min, _)| stats >= *min)
            .map(|(_, rank)| *rank)
            .unwrap_or(Rank::E)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E => "E",
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
            Self::S => "S",
            Self::SS => "SS",
            Self::SSS => "SSS",
        }
    }
}

pub fn rank_for_total_stats(stats: f64) -> Rank {
    Rank::for_total_stats(stats)
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Rank {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "E" => Ok(Self::E),
            "D" => Ok(Self::D),
            "C" => Ok(Self::C),
            "B" => Ok(Self::B),
            "A" => Ok(Self::A),
            "S" => Ok(Self::S),
            "SS" => Ok(Self::SS),
            "SSS" => Ok(Self::SSS),
            _ => Err(format!("Unknown rank: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
