// ABOUTME: HTTP request handlers for task operations
// ABOUTME: CRUD, status transitions, timers, recurrence, time entries, stats

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use daybook_journals::{GenerateParams, GenerateTrigger};
use daybook_tasks::{
    RecurrencePattern, Task, TaskCreateInput, TaskFilter, TaskPriority, TaskStatus,
    TaskUpdateInput,
};

use crate::auth::CurrentUser;
use crate::pagination::{clamp_limit, decode_time_cursor, encode_time_cursor, paginate};
use crate::response::{created_or_error, error_response, ok_or_error};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<String>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
    pub completed_from: Option<DateTime<Utc>>,
    pub completed_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

/// List tasks with filters and cursor pagination
pub async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListTasksQuery>,
) -> impl IntoResponse {
    info!("Listing tasks for user: {}", user.id);

    let limit = clamp_limit(query.limit);
    let cursor = match &query.cursor {
        Some(token) => match decode_time_cursor(token) {
            Ok(cursor) => Some(cursor),
            Err(e) => return error_response(e, "Failed to decode cursor"),
        },
        None => None,
    };

    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
        project_id: query.project_id,
        due_from: query.due_from,
        due_to: query.due_to,
        completed_from: query.completed_from,
        completed_to: query.completed_to,
        search: query.search,
        include_archived: query.include_archived,
    };

    let result = state
        .task_storage
        .list_tasks(&user.id, &filter, limit + 1, cursor)
        .await
        .map(|tasks| paginate(tasks, limit, |t: &Task| encode_time_cursor(t.created_at, &t.id)));

    ok_or_error(result, "Failed to list tasks")
}

pub async fn get_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    info!("Getting task: {}", task_id);

    let result = state.task_storage.get_task(&user.id, &task_id).await;
    ok_or_error(result, "Failed to get task")
}

pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<TaskCreateInput>,
) -> impl IntoResponse {
    info!("Creating task '{}' for user: {}", input.title, user.id);

    let result = state.task_storage.create_task(&user.id, input).await;
    created_or_error(result, "Failed to create task")
}

pub async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
    Json(input): Json<TaskUpdateInput>,
) -> impl IntoResponse {
    info!("Updating task: {}", task_id);

    let result = state.task_storage.update_task(&user.id, &task_id, input).await;
    ok_or_error(result, "Failed to update task")
}

pub async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    info!("Deleting task: {}", task_id);

    let result = state.task_storage.delete_task(&user.id, &task_id).await.map(|_| {
        serde_json::json!({
            "message": format!("Task {} deleted successfully", task_id)
        })
    });

    ok_or_error(result, "Failed to delete task")
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
    pub note: Option<String>,
}

/// Explicit status write; completing a task may also refresh the day's journal
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> impl IntoResponse {
    info!("Updating status of task {} to {:?}", task_id, request.status);

    let result = state
        .task_storage
        .update_status(&user.id, &task_id, request.status, request.note)
        .await;

    maybe_generate_on_completion(&state, &user, result.as_ref().ok()).await;

    ok_or_error(result, "Failed to update task status")
}

#[derive(Deserialize)]
pub struct RestartRequest {
    pub status: Option<TaskStatus>,
}

pub async fn restart_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
    Json(request): Json<RestartRequest>,
) -> impl IntoResponse {
    info!("Restarting task: {}", task_id);

    let result = state
        .task_storage
        .restart_task(&user.id, &task_id, request.status)
        .await;
    ok_or_error(result, "Failed to restart task")
}

pub async fn archive_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    info!("Archiving task: {}", task_id);

    let result = state.task_storage.archive_task(&user.id, &task_id).await;
    ok_or_error(result, "Failed to archive task")
}

pub async fn start_timer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    info!("Starting timer on task: {}", task_id);

    let result = state.task_storage.start_timer(&user.id, &task_id).await;
    ok_or_error(result, "Failed to start timer")
}

pub async fn pause_timer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    info!("Pausing timer on task: {}", task_id);

    let result = state.task_storage.pause_timer(&user.id, &task_id).await;
    ok_or_error(result, "Failed to pause timer")
}

/// Stop the timer: pause accounting plus a transition to DONE
pub async fn stop_timer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    info!("Stopping timer on task: {}", task_id);

    let result = state.task_storage.stop_timer(&user.id, &task_id).await;

    maybe_generate_on_completion(&state, &user, result.as_ref().ok()).await;

    ok_or_error(result, "Failed to stop timer")
}

#[derive(Deserialize)]
pub struct RecurrenceRequest {
    /// `null` clears the recurrence
    pub pattern: Option<RecurrencePattern>,
}

pub async fn set_recurring(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
    Json(request): Json<RecurrenceRequest>,
) -> impl IntoResponse {
    info!("Setting recurrence on task: {}", task_id);

    let result = state
        .task_storage
        .set_recurring(&user.id, &task_id, request.pattern)
        .await;
    ok_or_error(result, "Failed to set recurrence")
}

pub async fn generate_next_instance(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    info!("Generating next instance of task: {}", task_id);

    let result = state
        .task_storage
        .generate_next_instance(&user.id, &task_id)
        .await;
    created_or_error(result, "Failed to generate next instance")
}

pub async fn get_time_entries(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    info!("Getting time entries for task: {}", task_id);

    let result = state.task_storage.get_time_entries(&user.id, &task_id).await;
    ok_or_error(result, "Failed to get time entries")
}

pub async fn get_status_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    info!("Getting status history for task: {}", task_id);

    let result = state
        .task_storage
        .get_status_history(&user.id, &task_id)
        .await;
    ok_or_error(result, "Failed to get status history")
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn get_stats(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    info!("Getting task stats for user: {}", user.id);

    let result = state
        .task_storage
        .get_stats(&user.id, query.from, query.to)
        .await;
    ok_or_error(result, "Failed to get task stats")
}

/// The task-completion hook: when a transition landed on DONE, refresh the
/// day's journal if the user's settings ask for it. Never fails the request.
async fn maybe_generate_on_completion(state: &AppState, user: &CurrentUser, task: Option<&Task>) {
    let Some(task) = task else { return };
    if task.status != TaskStatus::Done {
        return;
    }

    let params = GenerateParams {
        date: None,
        force: false,
        template_name: None,
        respect_settings: true,
        trigger: GenerateTrigger::TaskCompletion,
    };

    match state.journal_generator.generate(&user.id, params).await {
        Ok(outcome) if !outcome.success => {
            debug!("Completion journal skipped for {}: {}", user.id, outcome.message)
        }
        Ok(_) => {}
        Err(e) => warn!("Journal generation after completion failed: {}", e),
    }
}
