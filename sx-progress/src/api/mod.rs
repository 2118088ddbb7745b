//! HTTP API for the progression service

pub mod error;
pub mod handlers;
pub mod health;
pub mod identity;

pub use error::{ApiError, ApiResult};
pub use handlers::{
    activate_course, complete_challenge, enroll_course, get_leaderboard, get_progress,
    miss_challenge, refill_hearts, register_user, set_current_lesson, update_subscription,
};
pub use health::health_routes;
pub use identity::USER_ID_HEADER;
