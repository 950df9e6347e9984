// ABOUTME: Authentication context for API requests
// ABOUTME: Trusts the user id installed by the fronting auth proxy

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Response,
};
use tracing::error;

use crate::response::{error_response, forbidden};
use crate::state::AppState;

/// Current authenticated user, taken from the `x-user-id` header the
/// auth proxy sets on every forwarded request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(|id| Self { id: id.to_string() })
            .ok_or((StatusCode::UNAUTHORIZED, "Missing x-user-id header"))
    }
}

/// Admin gate for administrative endpoints. Returns the error response
/// to send when the caller is not an admin.
pub async fn ensure_admin(state: &AppState, user: &CurrentUser) -> Option<Response> {
    match state.settings_storage.is_admin(&user.id).await {
        Ok(true) => None,
        Ok(false) => Some(forbidden()),
        Err(e) => {
            error!("Failed to check role for {}: {}", user.id, e);
            Some(error_response(e, "Failed to check role"))
        }
    }
}
