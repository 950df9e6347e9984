// ABOUTME: HTTP API layer for Daybook providing REST endpoints and routing
// ABOUTME: Integration layer that depends on all domain packages

use axum::{
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

pub mod auth;
pub mod journals_handlers;
pub mod notes_handlers;
pub mod pagination;
pub mod projects_handlers;
pub mod response;
pub mod scheduler_handlers;
pub mod settings_handlers;
pub mod state;
pub mod tags_handlers;
pub mod tasks_handlers;

pub use state::AppState;

/// The full API router mounted under /api
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/tasks", create_tasks_router())
        .nest("/api/projects", create_projects_router())
        .nest("/api/notes", create_notes_router())
        .nest("/api/journals", create_journals_router())
        .nest("/api/tags", create_tags_router())
        .nest("/api/settings", create_settings_router())
        .nest("/api/scheduler", create_scheduler_router())
        .route("/api/health", get(health))
        .with_state(state)
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Creates the tasks API router
pub fn create_tasks_router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks_handlers::list_tasks))
        .route("/", post(tasks_handlers::create_task))
        .route("/stats", get(tasks_handlers::get_stats))
        .route("/{task_id}", get(tasks_handlers::get_task))
        .route("/{task_id}", put(tasks_handlers::update_task))
        .route("/{task_id}", delete(tasks_handlers::delete_task))
        .route("/{task_id}/status", put(tasks_handlers::update_status))
        .route("/{task_id}/restart", post(tasks_handlers::restart_task))
        .route("/{task_id}/archive", post(tasks_handlers::archive_task))
        .route("/{task_id}/timer/start", post(tasks_handlers::start_timer))
        .route("/{task_id}/timer/pause", post(tasks_handlers::pause_timer))
        .route("/{task_id}/timer/stop", post(tasks_handlers::stop_timer))
        .route("/{task_id}/recurrence", put(tasks_handlers::set_recurring))
        .route(
            "/{task_id}/generate-next",
            post(tasks_handlers::generate_next_instance),
        )
        .route(
            "/{task_id}/time-entries",
            get(tasks_handlers::get_time_entries),
        )
        .route(
            "/{task_id}/history",
            get(tasks_handlers::get_status_history),
        )
}

/// Creates the projects API router
pub fn create_projects_router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects_handlers::list_projects))
        .route("/", post(projects_handlers::create_project))
        .route("/batch", post(projects_handlers::batch_operation))
        .route("/{project_id}", get(projects_handlers::get_project))
        .route("/{project_id}", put(projects_handlers::update_project))
        .route("/{project_id}", delete(projects_handlers::delete_project))
        .route("/{project_id}/archive", post(projects_handlers::archive_project))
        .route("/{project_id}/stats", get(projects_handlers::get_stats))
        .route("/{project_id}/tasks", get(projects_handlers::get_tasks))
        .route("/{project_id}/notes", get(projects_handlers::get_notes))
}

/// Creates the notes API router
pub fn create_notes_router() -> Router<AppState> {
    Router::new()
        .route("/", get(notes_handlers::list_notes))
        .route("/", post(notes_handlers::create_note))
        .route("/search", get(notes_handlers::search_notes))
        .route("/stats", get(notes_handlers::get_stats))
        .route("/batch", post(notes_handlers::batch_operation))
        .route("/{note_id}", get(notes_handlers::get_note))
        .route("/{note_id}", put(notes_handlers::update_note))
        .route("/{note_id}", delete(notes_handlers::delete_note))
        .route("/{note_id}/archive", post(notes_handlers::archive_note))
        .route("/{note_id}/links/{task_id}", post(notes_handlers::link_task))
        .route(
            "/{note_id}/links/{task_id}",
            delete(notes_handlers::unlink_task),
        )
}

/// Creates the journals API router
pub fn create_journals_router() -> Router<AppState> {
    Router::new()
        .route("/", get(journals_handlers::list_journals))
        .route("/", post(journals_handlers::create_journal))
        .route("/upsert", put(journals_handlers::upsert_journal))
        .route("/search", get(journals_handlers::search_journals))
        .route("/stats", get(journals_handlers::get_stats))
        .route("/timeline", get(journals_handlers::get_timeline))
        .route("/template-stats", get(journals_handlers::get_template_stats))
        .route("/writing-habits", get(journals_handlers::get_writing_habits))
        .route("/batch-delete", post(journals_handlers::batch_delete))
        .route("/auto-generate", post(journals_handlers::auto_generate))
        .route("/by-date/{date}", get(journals_handlers::get_by_date))
        .route("/{journal_id}", get(journals_handlers::get_journal))
        .route("/{journal_id}", put(journals_handlers::update_journal))
        .route("/{journal_id}", delete(journals_handlers::delete_journal))
}

/// Creates the tags API router
pub fn create_tags_router() -> Router<AppState> {
    Router::new()
        .route("/", get(tags_handlers::list_tags))
        .route("/", post(tags_handlers::create_tag))
        .route("/stats", get(tags_handlers::get_stats))
        .route("/batch-delete", post(tags_handlers::batch_delete))
        .route("/{tag_id}", get(tags_handlers::get_tag))
        .route("/{tag_id}", put(tags_handlers::update_tag))
        .route("/{tag_id}", delete(tags_handlers::delete_tag))
}

/// Creates the settings API router
pub fn create_settings_router() -> Router<AppState> {
    Router::new()
        .route("/", get(settings_handlers::get_settings))
        .route("/", put(settings_handlers::update_settings))
}

/// Creates the scheduler API router
pub fn create_scheduler_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(scheduler_handlers::get_status))
        .route(
            "/journal-generation",
            post(scheduler_handlers::execute_journal_generation),
        )
        .route("/execute/{job_id}", post(scheduler_handlers::execute_job))
}
