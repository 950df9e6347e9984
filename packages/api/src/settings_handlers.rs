// ABOUTME: HTTP request handlers for user settings
// ABOUTME: Defaults-on-first-read, role-preserving updates

use axum::{extract::State, response::IntoResponse, Json};
use tracing::{info, warn};

use daybook_settings::{Role, UserSettings};

use crate::auth::CurrentUser;
use crate::response::{error_response, ok_or_error};
use crate::state::AppState;

/// Current settings; a first read seeds the defaults row and the
/// user's system tags.
pub async fn get_settings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> impl IntoResponse {
    info!("Getting settings for user: {}", user.id);

    match state.settings_storage.find(&user.id).await {
        Ok(Some(settings)) => ok_or_error(Ok(settings), "Failed to get settings"),
        Ok(None) => {
            if let Err(e) = state.tag_storage.ensure_system_tags(&user.id).await {
                warn!("Failed to seed system tags for {}: {}", user.id, e);
            }
            let result = state
                .settings_storage
                .save(&user.id, &UserSettings::default())
                .await;
            ok_or_error(result, "Failed to initialize settings")
        }
        Err(e) => error_response(e, "Failed to get settings"),
    }
}

/// Replace the settings blob. Only admins can change the role field; for
/// everyone else the stored role is preserved.
pub async fn update_settings(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut incoming): Json<UserSettings>,
) -> impl IntoResponse {
    info!("Updating settings for user: {}", user.id);

    let current = match state.settings_storage.get_or_default(&user.id).await {
        Ok(current) => current,
        Err(e) => return error_response(e, "Failed to get settings"),
    };

    if current.role != Role::Admin {
        incoming.role = current.role;
    }

    let result = state.settings_storage.save(&user.id, &incoming).await;
    ok_or_error(result, "Failed to update settings")
}
