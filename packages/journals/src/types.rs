// ABOUTME: Journal type definitions
// ABOUTME: Journal entity, inputs, stats, timeline, and generation parameters

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One journal entry. Unique per (owner, entry_date); the date is the
/// local calendar day the entry belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journal {
    pub id: String,
    pub entry_date: NaiveDate,
    /// Markdown body
    pub content: String,
    pub template_name: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalCreateInput {
    /// Defaults to today (local) when absent
    pub entry_date: Option<NaiveDate>,
    pub content: Option<String>,
    pub template_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalUpdateInput {
    pub content: Option<String>,
    pub template_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalUpsertInput {
    pub entry_date: Option<NaiveDate>,
    pub content: String,
    pub template_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalStats {
    pub total_entries: i64,
    pub entries_this_month: i64,
    pub average_length_chars: i64,
    pub most_used_template: Option<String>,
}

/// One day on the month/year timeline view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDay {
    pub entry_date: NaiveDate,
    pub journal_id: String,
    pub content_length: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCount {
    pub template_name: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingHabits {
    pub days_window: i64,
    pub entries_in_window: i64,
    /// Consecutive days written, counting back from today (or yesterday)
    pub current_streak: i64,
    pub longest_streak: i64,
    pub average_length_chars: i64,
}

/// Which call site asked for generation; settings can disable each one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerateTrigger {
    Manual,
    TaskCompletion,
    Schedule,
}

#[derive(Debug, Clone)]
pub struct GenerateParams {
    /// Defaults to today (local) when absent
    pub date: Option<NaiveDate>,
    /// Overwrite a manually written entry for the day
    pub force: bool,
    pub template_name: Option<String>,
    /// When set, the user's settings may turn the run into a no-op
    pub respect_settings: bool,
    pub trigger: GenerateTrigger,
}

impl GenerateParams {
    pub fn manual(date: Option<NaiveDate>, template_name: Option<String>, force: bool) -> Self {
        Self {
            date,
            force,
            template_name,
            respect_settings: false,
            trigger: GenerateTrigger::Manual,
        }
    }
}

/// Result of a generation run. A policy skip (settings disabled, manual
/// entry in the way) is `success: false` with a message, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutcome {
    pub success: bool,
    pub message: String,
    pub journal_id: Option<String>,
    pub tasks_count: usize,
}

impl GenerateOutcome {
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            journal_id: None,
            tasks_count: 0,
        }
    }
}
