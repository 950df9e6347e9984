// ABOUTME: HTTP request handlers for journal operations
// ABOUTME: Date-keyed CRUD/upsert, search, stats, timeline, habits, auto-generation

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use daybook_journals::{
    GenerateParams, Journal, JournalCreateInput, JournalUpdateInput, JournalUpsertInput,
};

use crate::auth::CurrentUser;
use crate::pagination::{clamp_limit, decode_date_cursor, encode_date_cursor, paginate};
use crate::response::{created_or_error, error_response, ok_or_error};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJournalsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn list_journals(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListJournalsQuery>,
) -> impl IntoResponse {
    info!("Listing journals for user: {}", user.id);

    let limit = clamp_limit(query.limit);
    let cursor = match &query.cursor {
        Some(token) => match decode_date_cursor(token) {
            Ok(cursor) => Some(cursor),
            Err(e) => return error_response(e, "Failed to decode cursor"),
        },
        None => None,
    };

    let result = state
        .journal_storage
        .list_journals(&user.id, query.from, query.to, limit + 1, cursor)
        .await
        .map(|journals| {
            paginate(journals, limit, |j: &Journal| {
                encode_date_cursor(j.entry_date, &j.id)
            })
        });

    ok_or_error(result, "Failed to list journals")
}

pub async fn get_journal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(journal_id): Path<String>,
) -> impl IntoResponse {
    info!("Getting journal: {}", journal_id);

    let result = state.journal_storage.get_journal(&user.id, &journal_id).await;
    ok_or_error(result, "Failed to get journal")
}

pub async fn get_by_date(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(date): Path<NaiveDate>,
) -> impl IntoResponse {
    info!("Getting journal for date: {}", date);

    let result = state.journal_storage.get_by_date(&user.id, date).await;
    ok_or_error(result, "Failed to get journal")
}

pub async fn create_journal(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<JournalCreateInput>,
) -> impl IntoResponse {
    info!("Creating journal for user: {}", user.id);

    let result = state.journal_storage.create_journal(&user.id, input).await;
    created_or_error(result, "Failed to create journal")
}

pub async fn update_journal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(journal_id): Path<String>,
    Json(input): Json<JournalUpdateInput>,
) -> impl IntoResponse {
    info!("Updating journal: {}", journal_id);

    let result = state
        .journal_storage
        .update_journal(&user.id, &journal_id, input)
        .await;
    ok_or_error(result, "Failed to update journal")
}

pub async fn delete_journal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(journal_id): Path<String>,
) -> impl IntoResponse {
    info!("Deleting journal: {}", journal_id);

    let result = state
        .journal_storage
        .delete_journal(&user.id, &journal_id)
        .await
        .map(|_| {
            serde_json::json!({
                "message": format!("Journal {} deleted successfully", journal_id)
            })
        });

    ok_or_error(result, "Failed to delete journal")
}

/// Create or wholesale-replace the entry for a day
pub async fn upsert_journal(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<JournalUpsertInput>,
) -> impl IntoResponse {
    info!("Upserting journal for user: {}", user.id);

    let result = state.journal_storage.upsert(&user.id, input).await;
    ok_or_error(result, "Failed to upsert journal")
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}

pub async fn search_journals(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    info!("Searching journals for user: {}", user.id);

    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let result = state.journal_storage.search(&user.id, &query.q, limit).await;
    ok_or_error(result, "Failed to search journals")
}

pub async fn get_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> impl IntoResponse {
    info!("Getting journal stats for user: {}", user.id);

    let result = state.journal_storage.get_stats(&user.id).await;
    ok_or_error(result, "Failed to get journal stats")
}

#[derive(Deserialize)]
pub struct TimelineQuery {
    pub year: i32,
    pub month: Option<u32>,
}

pub async fn get_timeline(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<TimelineQuery>,
) -> impl IntoResponse {
    info!("Getting journal timeline for user: {}", user.id);

    let result = state
        .journal_storage
        .get_timeline(&user.id, query.year, query.month)
        .await;
    ok_or_error(result, "Failed to get timeline")
}

pub async fn get_template_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> impl IntoResponse {
    info!("Getting journal template stats for user: {}", user.id);

    let result = state.journal_storage.get_template_stats(&user.id).await;
    ok_or_error(result, "Failed to get template stats")
}

#[derive(Deserialize)]
pub struct WritingHabitsQuery {
    pub days: Option<i64>,
}

pub async fn get_writing_habits(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<WritingHabitsQuery>,
) -> impl IntoResponse {
    info!("Getting writing habits for user: {}", user.id);

    let days = query.days.unwrap_or(30).clamp(1, 365);
    let result = state.journal_storage.get_writing_habits(&user.id, days).await;
    ok_or_error(result, "Failed to get writing habits")
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
        "Batch deleting {} journals for user: {}",
        request.ids.len(),
        user.id
    );

    let result = state.journal_storage.batch_delete(&user.id, &request.ids).await;
    ok_or_error(result, "Failed to batch delete journals")
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoGenerateRequest {
    pub date: Option<NaiveDate>,
    pub template_name: Option<String>,
    #[serde(default)]
    pub force: bool,
}

/// Manual generation run. A policy skip comes back as a 200 with
/// `success: false` in the outcome, not as an error.
pub async fn auto_generate(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<AutoGenerateRequest>,
) -> impl IntoResponse {
    info!("Manual journal generation for user: {}", user.id);

    let params = GenerateParams::manual(request.date, request.template_name, request.force);
    let result = state.journal_generator.generate(&user.id, params).await;
    ok_or_error(result, "Failed to generate journal")
}
