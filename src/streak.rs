//! Daily Streak Engine
//!
//! One transition per local calendar day:
//! - first ever activity starts a streak
//! - activity the day after the last one continues it
//! - a gap of two or more days breaks it and starts over
//! - a second check on the same day changes nothing, apart from crediting a
//!   reward an earlier check could not
//!
//! Key principles:
//! - `now` is always passed in; the engine never reads the clock
//! - a transition and the reward it earns are committed to the store together;
//!   the reward is credited afterwards and stays pending until that succeeds
//! - notices only describe committed transitions
//! - collaborator failures (notifier, achievements, reward grant) are logged
//!   and never undo a committed transition

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::achievements::AchievementChecker;
use crate::models::StreakState;
use crate::notify::{Notifier, CATEGORY_ACHIEVEMENT, CATEGORY_REWARD, CATEGORY_STREAK};
use crate::progression::{LevelUp, ProgressionFacade};
use crate::store::{StoreError, StreakStore};

pub const BASE_DAILY_REWARD: u64 = 10;

/// (minimum streak, bonus XP). Bonuses stack.
const STREAK_BONUSES: [(u32, u64); 5] = [(7, 20), (14, 30), (30, 50), (60, 100), (100, 200)];

const DEFAULT_CONFLICT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreakError {
    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Streak record kept changing underneath us ({attempts} attempts)")]
    Conflict { attempts: u32 },
}

// ---------------------------------------------------------------------------
/// Reward
// ---------------------------------------------------------------------------

/// XP for the first activity of a day, given the streak length after it
pub fn daily_reward(current_streak: u32) -> u64 {
    let bonus: u64 = STREAK_BONUSES
        .iter()
        .filter(|(min, _)| current_streak >= *min)
        .map(|(_, bonus)| bonus)
        .sum();
    BASE_DAILY_REWARD + bonus
}

// ---------------------------------------------------------------------------
/// Transition: What one check did to the record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// No prior activity; day 1
    Started,
    /// Already recorded today
    AlreadyActiveToday,
    /// Last activity was yesterday
    Continued,
    /// Gap of two or more days
    Reset { broken_streak: u32 },
    /// Stored date is after today (clock or zone moved backwards)
    ClockSkew,
}

impl Transition {
    pub fn commits(&self) -> bool {
        matches!(
            self,
            Transition::Started | Transition::Continued | Transition::Reset { .. }
        )
    }
}

/// Read-only classification of the stored record against a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakStatus {
    Uninitialized,
    /// Also covers a stored date after `today`; nothing may be recorded then
    ActiveToday,
    /// Last activity yesterday: the streak survives if something happens today
    StreakAlive,
    StreakLapsed,
}

pub fn streak_status(state: &StreakState, today: NaiveDate) -> StreakStatus {
    match state.last_activity_date {
        None => StreakStatus::Uninitialized,
        Some(last) => match (today - last).num_days() {
            i64::MIN..=0 => StreakStatus::ActiveToday,
            1 => StreakStatus::StreakAlive,
            _ => StreakStatus::StreakLapsed,
        },
    }
}

/// Pure transition of `state` for activity on `today`
pub fn advance(state: &StreakState, today: NaiveDate) -> (Transition, StreakState) {
    let Some(last) = state.last_activity_date else {
        let next = StreakState {
            current_streak: 1,
            longest_streak: state.longest_streak.max(1),
            last_activity_date: Some(today),
            total_days_active: 1,
            streak_start_date: Some(today),
            pending_reward: state.pending_reward,
            version: state.version,
        };
        return (Transition::Started, next);
    };

    let gap = (today - last).num_days();

    if gap < 0 {
        return (Transition::ClockSkew, state.clone());
    }
    if gap == 0 {
        return (Transition::AlreadyActiveToday, state.clone());
    }

    let mut next = state.clone();
    next.last_activity_date = Some(today);
    next.total_days_active = state.total_days_active.saturating_add(1);

    let transition = if gap == 1 {
        next.current_streak = state.current_streak.saturating_add(1);
        Transition::Continued
    } else {
        next.current_streak = 1;
        next.streak_start_date = Some(today);
        Transition::Reset {
            broken_streak: state.current_streak,
        }
    };

    if next.streak_start_date.is_none() {
        next.streak_start_date = Some(today);
    }
    next.longest_streak = next.longest_streak.max(next.current_streak);
    next.total_days_active = next.total_days_active.max(next.current_streak);

    (transition, next)
}

// ---------------------------------------------------------------------------
/// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub reward_first_day: bool,
    /// Save attempts on database errors, per check
    pub save_attempts: u32,
    /// Reload-and-retry rounds after version conflicts
    pub conflict_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reward_first_day: false,
            save_attempts: 3,
            conflict_attempts: DEFAULT_CONFLICT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub transition: Transition,
    pub state: StreakState,
    /// XP the transition earned; 0 when nothing was committed
    pub reward: u64,
    pub reward_granted: bool,
    pub level_up: Option<LevelUp>,
}

impl StreakUpdate {
    fn unchanged(transition: Transition, state: StreakState) -> Self {
        Self {
            transition,
            state,
            reward: 0,
            reward_granted: false,
            level_up: None,
        }
    }
}

pub struct StreakEngine {
    store: Arc<dyn StreakStore>,
    progression: Arc<dyn ProgressionFacade>,
    notifier: Arc<dyn Notifier>,
    achievements: Option<Arc<dyn AchievementChecker>>,
    settings: EngineSettings,
    // Serializes checks within this process
    write_lock: Mutex<()>,
}

impl StreakEngine {
    pub fn new(
        store: Arc<dyn StreakStore>,
        progression: Arc<dyn ProgressionFacade>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            progression,
            notifier,
            achievements: None,
            settings,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_achievements(mut self, checker: Arc<dyn AchievementChecker>) -> Self {
        self.achievements = Some(checker);
        self
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Stored record, or the untouched default before the first activity
    pub async fn current_state(&self) -> Result<StreakState, StreakError> {
        self.store
            .load()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| StreakError::Persistence(e.to_string()))
    }

    /// Record activity at `now`. The calendar day is taken in `now`'s own zone.
    pub fn mark_activity<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> impl Future<Output = Result<StreakUpdate, StreakError>> + Send + '_ {
        self.mark_day(now.date_naive())
    }

    /// Record activity on a local calendar day
    pub async fn mark_day(&self, today: NaiveDate) -> Result<StreakUpdate, StreakError> {
        let _guard = self.write_lock.lock().await;

        let mut conflicts = 0;

        let (transition, state) = loop {
            let current = self.current_state().await?;
            let (transition, mut next) = advance(&current, today);

            if transition == Transition::ClockSkew {
                tracing::warn!(
                    %today,
                    last_activity = ?current.last_activity_date,
                    "Last activity is after today; leaving streak untouched"
                );
                return Ok(StreakUpdate::unchanged(transition, current));
            }

            if !transition.commits() {
                if current.pending_reward == 0 {
                    tracing::debug!(%today, streak = current.current_streak, "Activity already recorded today");
                    return Ok(StreakUpdate::unchanged(transition, current));
                }
                // An earlier check committed the day but never credited its reward
                break (transition, current);
            }

            // The day and its reward are committed together; crediting happens after
            next.pending_reward = current.pending_reward.saturating_add(self.reward_for(transition, &next));

            match self.commit(&next).await {
                Ok(version) => {
                    next.version = version;
                    tracing::info!(
                        ?transition,
                        %today,
                        current_streak = next.current_streak,
                        longest_streak = next.longest_streak,
                        total_days_active = next.total_days_active,
                        "Streak updated"
                    );
                    break (transition, next);
                }
                Err(StoreError::Conflict { expected }) => {
                    conflicts += 1;
                    if conflicts >= self.settings.conflict_attempts.max(1) {
                        tracing::error!(attempts = conflicts, "Giving up on streak update after repeated conflicts");
                        return Err(StreakError::Conflict { attempts: conflicts });
                    }
                    tracing::warn!(expected, attempt = conflicts, "Streak record changed concurrently, re-evaluating");
                }
                Err(e) => return Err(StreakError::Persistence(e.to_string())),
            }
        };

        Ok(self.after_commit(transition, state).await)
    }

    fn reward_for(&self, transition: Transition, next: &StreakState) -> u64 {
        match transition {
            Transition::Started if !self.settings.reward_first_day => 0,
            Transition::Started | Transition::Continued | Transition::Reset { .. } => {
                daily_reward(next.current_streak)
            }
            Transition::AlreadyActiveToday | Transition::ClockSkew => 0,
        }
    }

    /// Save with retries on database errors. Conflicts return immediately.
    async fn commit(&self, state: &StreakState) -> Result<i64, StoreError> {
        let attempts = self.settings.save_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.store.save(state).await {
                Ok(version) => return Ok(version),
                Err(StoreError::Database(msg)) if attempt < attempts => {
                    tracing::warn!(attempt, error = %msg, "Streak save failed, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "Streak save failed");
                    return Err(e);
                }
            }
        }
    }

    async fn after_commit(&self, transition: Transition, state: StreakState) -> StreakUpdate {
        match transition {
            Transition::Started => {
                self.notify_quietly(
                    "Streak Started",
                    "Day 1. Come back tomorrow to keep it going.",
                    CATEGORY_STREAK,
                )
                .await;
            }
            Transition::Reset { broken_streak } if broken_streak > 0 => {
                self.notify_quietly(
                    "Streak Broken",
                    &format!("Your {}-day streak has ended. A new one starts today.", broken_streak),
                    CATEGORY_STREAK,
                )
                .await;
            }
            _ => {}
        }

        let settled = self.settle_reward(transition, state).await;

        if transition.commits() {
            if let Some(checker) = &self.achievements {
                match checker.check_streak(&settled.state).await {
                    Ok(unlocked) => {
                        for achievement in unlocked {
                            self.notify_quietly(
                                "Achievement Unlocked",
                                &format!("{}: {}", achievement.name, achievement.description),
                                CATEGORY_ACHIEVEMENT,
                            )
                            .await;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Achievement check failed"),
                }
            }
        }

        settled
    }

    /// Credit the record's pending reward exactly once.
    ///
    /// The pending amount is claimed by a versioned save before the grant, so
    /// only one session can credit it. If the grant fails the amount is put
    /// back for the next check.
    async fn settle_reward(&self, transition: Transition, mut state: StreakState) -> StreakUpdate {
        let mut conflicts = 0;

        let owed = loop {
            let owed = state.pending_reward;
            if owed == 0 {
                return StreakUpdate::unchanged(transition, state);
            }

            let mut claimed = StreakState {
                pending_reward: 0,
                ..state.clone()
            };
            match self.commit(&claimed).await {
                Ok(version) => {
                    claimed.version = version;
                    state = claimed;
                    break owed;
                }
                Err(StoreError::Conflict { .. }) if conflicts + 1 < self.settings.conflict_attempts.max(1) => {
                    conflicts += 1;
                    match self.store.load().await {
                        Ok(Some(reloaded)) => state = reloaded,
                        Ok(None) => return StreakUpdate::unchanged(transition, state),
                        Err(e) => {
                            tracing::warn!(owed, error = %e, "Could not reload streak record; reward stays pending");
                            return StreakUpdate::unchanged(transition, state);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(owed, error = %e, "Could not claim streak reward; it stays pending");
                    return StreakUpdate {
                        reward: owed,
                        ..StreakUpdate::unchanged(transition, state)
                    };
                }
            }
        };

        let reason = if transition.commits() {
            format!("Daily streak reward (day {})", state.current_streak)
        } else {
            "Deferred daily streak reward".to_string()
        };

        match self.progression.add_xp(owed, &reason).await {
            Ok(summary) => {
                let message = match (transition.commits(), summary.leveled_up()) {
                    (true, true) => format!(
                        "+{} XP for day {}. Level {} reached!",
                        owed, state.current_streak, summary.level_after
                    ),
                    (true, false) => format!("+{} XP for day {} of your streak.", owed, state.current_streak),
                    (false, true) => format!("+{} XP from an earlier streak day. Level {} reached!", owed, summary.level_after),
                    (false, false) => format!("+{} XP from an earlier streak day.", owed),
                };
                self.notify_quietly("Daily Reward", &message, CATEGORY_REWARD).await;
                StreakUpdate {
                    transition,
                    state,
                    reward: owed,
                    reward_granted: true,
                    level_up: Some(summary),
                }
            }
            Err(e) => {
                tracing::error!(owed, error = %e, "Failed to grant streak reward; keeping it pending");
                let state = self.restore_pending(state, owed).await;
                StreakUpdate {
                    reward: owed,
                    ..StreakUpdate::unchanged(transition, state)
                }
            }
        }
    }

    /// Put a claimed but ungranted reward back on the record
    async fn restore_pending(&self, mut state: StreakState, owed: u64) -> StreakState {
        for _ in 0..self.settings.conflict_attempts.max(1) {
            let mut restored = StreakState {
                pending_reward: state.pending_reward.saturating_add(owed),
                ..state.clone()
            };
            match self.commit(&restored).await {
                Ok(version) => {
                    restored.version = version;
                    return restored;
                }
                Err(StoreError::Conflict { .. }) => match self.store.load().await {
                    Ok(Some(reloaded)) => state = reloaded,
                    Ok(None) | Err(_) => break,
                },
                Err(_) => break,
            }
        }

        tracing::error!(owed, "Streak reward could not be kept pending and is lost");
        state
    }

    async fn notify_quietly(&self, title: &str, message: &str, category: &str) {
        if let Err(e) = self.notifier.notify(title, message, category).await {
            tracing::warn!(title, category, error = %e, "Notification failed");
        }
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
