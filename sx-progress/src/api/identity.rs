//! Caller identity extraction
//!
//! The authentication provider sits in front of this service and forwards the
//! authenticated user id in the `x-user-id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::error::ApiError;
use crate::caller::CallerId;
use crate::error::Error;

pub const USER_ID_HEADER: &str = "x-user-id";

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError(Error::Unauthorized))?;

        Ok(CallerId::new(raw)?)
    }
}
