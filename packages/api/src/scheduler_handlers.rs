// ABOUTME: HTTP request handlers for the journal scheduler
// ABOUTME: Status and manual execution endpoints for the scheduling collaborator

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::auth::{ensure_admin, CurrentUser};
use crate::response::ok_or_error;
use crate::state::AppState;

/// Scheduler status across all users; admin only
pub async fn get_status(
    State(state): State<AppState>,
    user: CurrentUser,
) -> impl IntoResponse {
    info!("Getting scheduler status for user: {}", user.id);

    if let Some(denied) = ensure_admin(&state, &user).await {
        return denied;
    }

    let result = state.scheduler.status().await;
    ok_or_error(result, "Failed to get scheduler status")
}

#[derive(Deserialize)]
pub struct ExecuteGenerationRequest {
    pub date: Option<NaiveDate>,
}

/// Run the scheduled journal generation for the caller right now.
/// Settings still apply: a disabled schedule produces a skip outcome.
pub async fn execute_journal_generation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ExecuteGenerationRequest>,
) -> impl IntoResponse {
    info!("Manual scheduler run for user: {}", user.id);

    let result = state.scheduler.run_for_user(&user.id, request.date).await;
    ok_or_error(result, "Failed to run journal generation")
}

/// Run a registered scheduler job for every scheduled user; admin only
pub async fn execute_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    info!("Executing scheduler job {} for user: {}", job_id, user.id);

    if let Some(denied) = ensure_admin(&state, &user).await {
        return denied;
    }

    let result = state.scheduler.execute_job(&job_id).await;
    ok_or_error(result, "Failed to execute scheduler job")
}
