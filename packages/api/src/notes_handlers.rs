// ABOUTME: HTTP request handlers for note operations
// ABOUTME: CRUD, task links, search, stats, batch operations

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use daybook_notes::{Note, NoteBatchOp, NoteCreateInput, NoteUpdateInput};

use crate::auth::CurrentUser;
use crate::pagination::{clamp_limit, decode_time_cursor, encode_time_cursor, paginate};
use crate::response::{created_or_error, error_response, ok_or_error};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotesQuery {
    #[serde(default)]
    pub include_archived: bool,
    pub project_id: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn list_notes(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListNotesQuery>,
) -> impl IntoResponse {
    info!("Listing notes for user: {}", user.id);

    let limit = clamp_limit(query.limit);
    let cursor = match &query.cursor {
        Some(token) => match decode_time_cursor(token) {
            Ok(cursor) => Some(cursor),
            Err(e) => return error_response(e, "Failed to decode cursor"),
        },
        None => None,
    };

    let result = state
        .note_storage
        .list_notes(
            &user.id,
            query.include_archived,
            query.project_id.as_deref(),
            limit + 1,
            cursor,
        )
        .await
        .map(|notes| paginate(notes, limit, |n: &Note| encode_time_cursor(n.created_at, &n.id)));

    ok_or_error(result, "Failed to list notes")
}

pub async fn get_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(note_id): Path<String>,
) -> impl IntoResponse {
    info!("Getting note: {}", note_id);

    let result = state.note_storage.get_note(&user.id, &note_id).await;
    ok_or_error(result, "Failed to get note")
}

pub async fn create_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<NoteCreateInput>,
) -> impl IntoResponse {
    info!("Creating note '{}' for user: {}", input.title, user.id);

    let result = state.note_storage.create_note(&user.id, input).await;
    created_or_error(result, "Failed to create note")
}

pub async fn update_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(note_id): Path<String>,
    Json(input): Json<NoteUpdateInput>,
) -> impl IntoResponse {
    info!("Updating note: {}", note_id);

    let result = state.note_storage.update_note(&user.id, &note_id, input).await;
    ok_or_error(result, "Failed to update note")
}

pub async fn delete_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(note_id): Path<String>,
) -> impl IntoResponse {
    info!("Deleting note: {}", note_id);

    let result = state.note_storage.delete_note(&user.id, &note_id).await.map(|_| {
        serde_json::json!({
            "message": format!("Note {} deleted successfully", note_id)
        })
    });

    ok_or_error(result, "Failed to delete note")
}

pub async fn archive_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(note_id): Path<String>,
) -> impl IntoResponse {
    info!("Archiving note: {}", note_id);

    let result = state.note_storage.archive_note(&user.id, &note_id).await;
    ok_or_error(result, "Failed to archive note")
}

pub async fn link_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((note_id, task_id)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("Linking note {} to task {}", note_id, task_id);

    let result = state.note_storage.link_task(&user.id, &note_id, &task_id).await;
    ok_or_error(result, "Failed to link task")
}

pub async fn unlink_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((note_id, task_id)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("Unlinking note {} from task {}", note_id, task_id);

    let result = state
        .note_storage
        .unlink_task(&user.id, &note_id, &task_id)
        .await;
    ok_or_error(result, "Failed to unlink task")
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}

pub async fn search_notes(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    info!("Searching notes for user: {}", user.id);

    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let result = state.note_storage.search(&user.id, &query.q, limit).await;
    ok_or_error(result, "Failed to search notes")
}

pub async fn get_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> impl IntoResponse {
    info!("Getting note stats for user: {}", user.id);

    let result = state.note_storage.get_stats(&user.id).await;
    ok_or_error(result, "Failed to get note stats")
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteBatchOpKind {
    Archive,
    Unarchive,
    Delete,
    Move,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBatchRequest {
    pub op: NoteBatchOpKind,
    pub ids: Vec<String>,
    /// Target for `move`; absent means "no project"
    pub project_id: Option<String>,
}

pub async fn batch_operation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<NoteBatchRequest>,
) -> impl IntoResponse {
    info!(
        "Batch note operation for user {} over {} ids",
        user.id,
        request.ids.len()
    );

    let op = match request.op {
        NoteBatchOpKind::Archive => NoteBatchOp::Archive,
        NoteBatchOpKind::Unarchive => NoteBatchOp::Unarchive,
        NoteBatchOpKind::Delete => NoteBatchOp::Delete,
        NoteBatchOpKind::Move => NoteBatchOp::Move(request.project_id),
    };

    let result = state
        .note_storage
        .batch_operation(&user.id, &request.ids, op)
        .await;
    ok_or_error(result, "Failed to run batch operation")
}
