//! sx-progress library - learner progression service
//!
//! Enrollment, challenge attempts, the hearts economy and points, exposed as
//! a library and over HTTP.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod caller;
pub mod db;
pub mod error;
pub mod outcome;
pub mod service;

pub use caller::CallerId;
pub use error::{Error, Result};
pub use outcome::{Outcome, Refusal};
pub use service::ProgressionService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: ProgressionService,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            service: ProgressionService::new(db::ProgressStore::new(pool)),
        }
    }
}

/// Build application router
///
/// Everything under `/api` requires the caller identity header; `/health`
/// does not.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let api = Router::new()
        .route("/api/users", post(api::register_user))
        .route("/api/subscription", put(api::update_subscription))
        .route("/api/challenges/:id/complete", post(api::complete_challenge))
        .route("/api/challenges/:id/miss", post(api::miss_challenge))
        .route("/api/hearts/refill", post(api::refill_hearts))
        .route("/api/courses/:id/activate", post(api::activate_course))
        .route("/api/courses/:id/enroll", post(api::enroll_course))
        .route("/api/lessons/:id/current", post(api::set_current_lesson))
        .route("/api/progress", get(api::get_progress))
        .route("/api/leaderboard", get(api::get_leaderboard));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
