//! Progression endpoints
//!
//! Thin wrappers: extract identity and ids, call the service, serialize the
//! result. Refusals are returned as 200 with `"status": "refused"`.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use sx_common::db::{Enrollment, User};

use super::error::ApiResult;
use crate::caller::CallerId;
use crate::outcome::Outcome;
use crate::service::{
    ChallengeRecorded, EnrollmentChange, HeartConsumed, HeartsRefilled, LeaderboardEntry,
    ProgressSummary, SubscriptionStatus, SubscriptionUpdate,
};
use crate::AppState;

/// POST /api/challenges/:id/complete
pub async fn complete_challenge(
    State(state): State<AppState>,
    caller: CallerId,
    Path(challenge_id): Path<i64>,
) -> ApiResult<Json<Outcome<ChallengeRecorded>>> {
    let outcome = state
        .service
        .record_challenge_outcome(&caller, challenge_id)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/challenges/:id/miss
pub async fn miss_challenge(
    State(state): State<AppState>,
    caller: CallerId,
    Path(challenge_id): Path<i64>,
) -> ApiResult<Json<Outcome<HeartConsumed>>> {
    let outcome = state.service.consume_heart(&caller, challenge_id).await?;
    Ok(Json(outcome))
}

/// POST /api/hearts/refill
pub async fn refill_hearts(
    State(state): State<AppState>,
    caller: CallerId,
) -> ApiResult<Json<Outcome<HeartsRefilled>>> {
    let outcome = state.service.refill_hearts(&caller).await?;
    Ok(Json(outcome))
}

/// POST /api/courses/:id/activate
pub async fn activate_course(
    State(state): State<AppState>,
    caller: CallerId,
    Path(course_id): Path<i64>,
) -> ApiResult<Json<EnrollmentChange>> {
    let change = state
        .service
        .activate_enrollment(&caller, course_id)
        .await?;
    Ok(Json(change))
}

/// POST /api/courses/:id/enroll
pub async fn enroll_course(
    State(state): State<AppState>,
    caller: CallerId,
    Path(course_id): Path<i64>,
) -> ApiResult<Json<EnrollmentChange>> {
    let change = state.service.enroll_course(&caller, course_id).await?;
    Ok(Json(change))
}

/// POST /api/lessons/:id/current
pub async fn set_current_lesson(
    State(state): State<AppState>,
    caller: CallerId,
    Path(lesson_id): Path<i64>,
) -> ApiResult<Json<Enrollment>> {
    let enrollment = state.service.set_current_lesson(&caller, lesson_id).await?;
    Ok(Json(enrollment))
}

/// GET /api/progress
pub async fn get_progress(
    State(state): State<AppState>,
    caller: CallerId,
) -> ApiResult<Json<ProgressSummary>> {
    let summary = state.service.progress_summary(&caller).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}

/// GET /api/leaderboard
pub async fn get_leaderboard(
    State(state): State<AppState>,
    _caller: CallerId,
    Query(params): Query<LeaderboardParams>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let entries = state.service.leaderboard(params.limit).await?;
    Ok(Json(entries))
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
}

/// POST /api/users
pub async fn register_user(
    State(state): State<AppState>,
    caller: CallerId,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<User>> {
    let user = state
        .service
        .register_user(&caller, request.name.as_deref())
        .await?;
    Ok(Json(user))
}

/// PUT /api/subscription
pub async fn update_subscription(
    State(state): State<AppState>,
    caller: CallerId,
    Json(update): Json<SubscriptionUpdate>,
) -> ApiResult<Json<SubscriptionStatus>> {
    let status = state.service.update_subscription(&caller, update).await?;
    Ok(Json(status))
}
