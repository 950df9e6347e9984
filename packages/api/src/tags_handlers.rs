// ABOUTME: HTTP request handlers for tag operations
// ABOUTME: CRUD with system-tag protection, usage stats, batch delete

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use daybook_tags::{Tag, TagCreateInput, TagUpdateInput};

use crate::auth::CurrentUser;
use crate::pagination::{decode_text_cursor, encode_text_cursor, paginate, CursorParams};
use crate::response::{created_or_error, error_response, ok_or_error};
use crate::state::AppState;

pub async fn list_tags(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<CursorParams>,
) -> impl IntoResponse {
    info!("Listing tags for user: {}", user.id);

    let limit = page.limit();
    let cursor = match &page.cursor {
        Some(token) => match decode_text_cursor(token) {
            Ok(cursor) => Some(cursor),
            Err(e) => return error_response(e, "Failed to decode cursor"),
        },
        None => None,
    };

    let result = state
        .tag_storage
        .list_tags(&user.id, limit + 1, cursor)
        .await
        .map(|tags| paginate(tags, limit, |t: &Tag| encode_text_cursor(&t.name, &t.id)));

    ok_or_error(result, "Failed to list tags")
}

pub async fn get_tag(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tag_id): Path<String>,
) -> impl IntoResponse {
    info!("Getting tag: {}", tag_id);

    let result = state.tag_storage.get_tag(&user.id, &tag_id).await;
    ok_or_error(result, "Failed to get tag")
}

pub async fn create_tag(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<TagCreateInput>,
) -> impl IntoResponse {
    info!("Creating tag '{}' for user: {}", input.name, user.id);

    let result = state.tag_storage.create_tag(&user.id, input).await;
    created_or_error(result, "Failed to create tag")
}

pub async fn update_tag(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tag_id): Path<String>,
    Json(input): Json<TagUpdateInput>,
) -> impl IntoResponse {
    info!("Updating tag: {}", tag_id);

    let result = state.tag_storage.update_tag(&user.id, &tag_id, input).await;
    ok_or_error(result, "Failed to update tag")
}

pub async fn delete_tag(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tag_id): Path<String>,
) -> impl IntoResponse {
    info!("Deleting tag: {}", tag_id);

    let result = state.tag_storage.delete_tag(&user.id, &tag_id).await.map(|_| {
        serde_json::json!({
            "message": format!("Tag {} deleted successfully", tag_id)
        })
    });

    ok_or_error(result, "Failed to delete tag")
}

pub async fn get_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> impl IntoResponse {
    info!("Getting tag stats for user: {}", user.id);

    let result = state.tag_storage.get_stats(&user.id).await;
    ok_or_error(result, "Failed to get tag stats")
}

#[derive(Deserialize)]
pub struct BatchDeleteRequest {
    pub ids: Vec<String>,
}

pub async fn batch_delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<BatchDeleteRequest>,
) -> impl IntoResponse {
    info!(
        "Batch deleting {} tags for user: {}",
        request.ids.len(),
        user.id
    );

    let result = state.tag_storage.batch_delete(&user.id, &request.ids).await;
    ok_or_error(result, "Failed to batch delete tags")
}
