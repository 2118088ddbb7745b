//! HTTP mapping of hard failures
//!
//! Business refusals never reach this type; they are 200 responses carrying a
//! `refused` status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::Error;

/// API error wrapper around the service error
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::NoActiveEnrollment(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_ACTIVE_ENROLLMENT")
            }
            Error::EmptyCourse(_) => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_COURSE"),
            Error::PracticeDuplicateRace { .. } => (StatusCode::CONFLICT, "DUPLICATE_ATTEMPT"),
            Error::CourseDocument(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Error::Database(_) | Error::Common(_) => {
                error!("Request failed: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.0.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
