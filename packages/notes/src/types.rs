// ABOUTME: Note type definitions
// ABOUTME: Note entity, create/update inputs, statistics, batch operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    /// Markdown body
    pub content: String,
    pub summary: Option<String>,
    pub is_pinned: bool,
    pub is_archived: bool,
    pub project_id: Option<String>,
    pub tags: Vec<String>,
    pub linked_tasks: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCreateInput {
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub project_id: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdateInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub is_pinned: Option<bool>,
    pub project_id: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    pub total_notes: i64,
    pub pinned_notes: i64,
    pub archived_notes: i64,
    pub notes_with_links: i64,
}

/// Batch operations over a set of notes. `Move` re-homes them to a
/// project (or to none).
#[derive(Debug, Clone)]
pub enum NoteBatchOp {
    Archive,
    Unarchive,
    Delete,
    Move(Option<String>),
}
