// ABOUTME: HTTP request handlers for project operations
// ABOUTME: CRUD, archiving, stats, owned task/note listings, batch operations

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use daybook_notes::Note;
use daybook_projects::{Project, ProjectBatchOp, ProjectCreateInput, ProjectUpdateInput};
use daybook_tasks::{Task, TaskFilter};

use crate::auth::CurrentUser;
use crate::pagination::{
    clamp_limit, decode_time_cursor, encode_time_cursor, paginate, CursorParams,
};
use crate::response::{created_or_error, error_response, ok_or_error};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    #[serde(default)]
    pub include_archived: bool,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListProjectsQuery>,
) -> impl IntoResponse {
    info!("Listing projects for user: {}", user.id);

    let limit = clamp_limit(query.limit);
    let cursor = match &query.cursor {
        Some(token) => match decode_time_cursor(token) {
            Ok(cursor) => Some(cursor),
            Err(e) => return error_response(e, "Failed to decode cursor"),
        },
        None => None,
    };

    let result = state
        .project_storage
        .list_projects(&user.id, query.include_archived, limit + 1, cursor)
        .await
        .map(|projects| {
            paginate(projects, limit, |p: &Project| {
                encode_time_cursor(p.created_at, &p.id)
            })
        });

    ok_or_error(result, "Failed to list projects")
}

pub async fn get_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    info!("Getting project: {}", project_id);

    let result = state.project_storage.get_project(&user.id, &project_id).await;
    ok_or_error(result, "Failed to get project")
}

pub async fn create_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<ProjectCreateInput>,
) -> impl IntoResponse {
    info!("Creating project '{}' for user: {}", input.name, user.id);

    let result = state.project_storage.create_project(&user.id, input).await;
    created_or_error(result, "Failed to create project")
}

pub async fn update_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
    Json(input): Json<ProjectUpdateInput>,
) -> impl IntoResponse {
    info!("Updating project: {}", project_id);

    let result = state
        .project_storage
        .update_project(&user.id, &project_id, input)
        .await;
    ok_or_error(result, "Failed to update project")
}

pub async fn delete_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    info!("Deleting project: {}", project_id);

    let result = state
        .project_storage
        .delete_project(&user.id, &project_id)
        .await
        .map(|_| {
            serde_json::json!({
                "message": format!("Project {} deleted successfully", project_id)
            })
        });

    ok_or_error(result, "Failed to delete project")
}

pub async fn archive_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    info!("Archiving project: {}", project_id);

    let result = state
        .project_storage
        .archive_project(&user.id, &project_id)
        .await;
    ok_or_error(result, "Failed to archive project")
}

pub async fn get_stats(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    info!("Getting stats for project: {}", project_id);

    let result = state.project_storage.get_stats(&user.id, &project_id).await;
    ok_or_error(result, "Failed to get project stats")
}

/// The project's tasks, via the task storage with a project filter
pub async fn get_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
    Query(page): Query<CursorParams>,
) -> impl IntoResponse {
    info!("Listing tasks of project: {}", project_id);

    // Ownership check up front so a foreign project reads as missing
    if let Err(e) = state.project_storage.get_project(&user.id, &project_id).await {
        return error_response(e, "Failed to get project");
    }

    let limit = page.limit();
    let cursor = match &page.cursor {
        Some(token) => match decode_time_cursor(token) {
            Ok(cursor) => Some(cursor),
            Err(e) => return error_response(e, "Failed to decode cursor"),
        },
        None => None,
    };

    let filter = TaskFilter {
        project_id: Some(project_id),
        include_archived: true,
        ..Default::default()
    };

    let result = state
        .task_storage
        .list_tasks(&user.id, &filter, limit + 1, cursor)
        .await
        .map(|tasks| paginate(tasks, limit, |t: &Task| encode_time_cursor(t.created_at, &t.id)));

    ok_or_error(result, "Failed to list project tasks")
}

pub async fn get_notes(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
    Query(page): Query<CursorParams>,
) -> impl IntoResponse {
    info!("Listing notes of project: {}", project_id);

    if let Err(e) = state.project_storage.get_project(&user.id, &project_id).await {
        return error_response(e, "Failed to get project");
    }

    let limit = page.limit();
    let cursor = match &page.cursor {
        Some(token) => match decode_time_cursor(token) {
            Ok(cursor) => Some(cursor),
            Err(e) => return error_response(e, "Failed to decode cursor"),
        },
        None => None,
    };

    let result = state
        .note_storage
        .list_notes(&user.id, true, Some(&project_id), limit + 1, cursor)
        .await
        .map(|notes| paginate(notes, limit, |n: &Note| encode_time_cursor(n.created_at, &n.id)));

    ok_or_error(result, "Failed to list project notes")
}

#[derive(Deserialize)]
pub struct ProjectBatchRequest {
    pub op: ProjectBatchOp,
    pub ids: Vec<String>,
}

pub async fn batch_operation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ProjectBatchRequest>,
) -> impl IntoResponse {
    info!(
        "Batch project operation for user {} over {} ids",
        user.id,
        request.ids.len()
    );

    let result = state
        .project_storage
        .batch_operation(&user.id, &request.ids, request.op)
        .await;
    ok_or_error(result, "Failed to run batch operation")
}
