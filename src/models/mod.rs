pub mod streak;
pub mod player;
pub mod notification;

pub use streak::StreakState;
pub use player::{PlayerProgress, PlayerStats, StatKind, XpEvent};
pub use notification::{Achievement, Notification};
