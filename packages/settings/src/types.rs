// ABOUTME: User settings type definitions
// ABOUTME: Versioned blob with journal, notification, and UI preference sections

use serde::{Deserialize, Serialize};

use daybook_core::SETTINGS_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// Auto journal generation preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalPrefs {
    pub auto_generation_enabled: bool,
    pub generate_on_task_completion: bool,
    pub daily_schedule_enabled: bool,
    /// Local time of day for the scheduled run, "HH:MM"
    pub schedule_time: String,
    pub include_time_spent: bool,
    pub include_project: bool,
    pub include_tags: bool,
    pub template_name: String,
}

impl Default for JournalPrefs {
    fn default() -> Self {
        Self {
            auto_generation_enabled: true,
            generate_on_task_completion: false,
            daily_schedule_enabled: false,
            schedule_time: "23:55".to_string(),
            include_time_spent: true,
            include_project: true,
            include_tags: false,
            template_name: "daily-auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPrefs {
    pub due_reminders: bool,
    pub daily_summary: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            due_reminders: true,
            daily_summary: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiPrefs {
    pub theme: String,
    pub week_starts_monday: bool,
    pub default_task_view: String,
}

impl Default for UiPrefs {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
            week_starts_monday: true,
            default_task_view: "today".to_string(),
        }
    }
}

/// The whole per-user configuration blob. Stored as one JSON value; every
/// field carries a serde default so blobs written by older versions (or
/// partial client payloads) read back with current defaults filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub version: u32,
    pub role: Role,
    pub journal: JournalPrefs,
    pub notifications: NotificationPrefs,
    pub ui: UiPrefs,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            role: Role::default(),
            journal: JournalPrefs::default(),
            notifications: NotificationPrefs::default(),
            ui: UiPrefs::default(),
        }
    }
}
