// ABOUTME: Tag type definitions
// ABOUTME: Tag entity, create/update inputs, and usage statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Context,
    Project,
    Priority,
    Custom,
}

impl Default for TagKind {
    fn default() -> Self {
        TagKind::Custom
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub kind: TagKind,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_system: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCreateInput {
    pub name: String,
    pub kind: Option<TagKind>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagUpdateInput {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Usage counts for a single tag
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagUsage {
    pub id: String,
    pub name: String,
    pub task_count: i64,
    pub note_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagKindCount {
    pub kind: TagKind,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagStats {
    pub total_tags: i64,
    pub system_tags: i64,
    pub kind_counts: Vec<TagKindCount>,
    pub most_used: Vec<TagUsage>,
}
