use axum::{extract::FromRequestParts, http::request::Parts};
use travelbook_shared::UserId;

use crate::error::AppError;

/// Header carrying the caller's identity, set by a trusted upstream proxy
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts on behalf of.
///
/// Rejects with 401 when the header is missing or not a valid user id.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::AuthenticationError("Missing X-User-Id header".to_string()))?
            .to_str()
            .map_err(|_| AppError::AuthenticationError("Malformed X-User-Id header".to_string()))?;

        UserId::new(raw)
            .map(CurrentUser)
            .map_err(|e| AppError::AuthenticationError(format!("Malformed X-User-Id header: {}", e)))
    }
}
