//! Hearts and points economy constants

pub use sx_common::db::MAX_HEARTS;

/// Points credited for every completed challenge, first attempt or practice
pub const CHALLENGE_REWARD: i64 = 10;

/// Points charged for a full heart refill
pub const REFILL_COST: i64 = 10;

/// Leaderboard length when the caller does not ask for one
pub const DEFAULT_LEADERBOARD_SIZE: i64 = 10;

/// Largest leaderboard a caller may request
pub const MAX_LEADERBOARD_SIZE: i64 = 100;

/// Whole-number completion percentage, 0 for a course without challenges
pub fn progress_percent(completed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (completed.clamp(0, total) * 100) / total
}
