// ABOUTME: Storage operations for per-user settings
// ABOUTME: JSON blob persistence with defaults merged on read

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use daybook_storage::StorageResult;

use crate::types::{Role, UserSettings};

pub struct SettingsStorage {
    pool: SqlitePool,
}

impl SettingsStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The stored settings for a user, if a row exists
    pub async fn find(&self, user_id: &str) -> StorageResult<Option<UserSettings>> {
        debug!("Fetching settings for user: {}", user_id);

        let row = sqlx::query("SELECT settings FROM user_settings WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => {
                let blob: String = r.try_get("settings")?;
                Ok(Some(serde_json::from_str(&blob)?))
            }
            None => Ok(None),
        }
    }

    /// Settings for a user, falling back to defaults when none are stored.
    /// Missing fields in a stored blob come back as defaults via serde.
    pub async fn get_or_default(&self, user_id: &str) -> StorageResult<UserSettings> {
        Ok(self.find(user_id).await?.unwrap_or_default())
    }

    /// Persist the full settings blob for a user
    pub async fn save(&self, user_id: &str, settings: &UserSettings) -> StorageResult<UserSettings> {
        debug!("Saving settings for user: {}", user_id);

        let blob = serde_json::to_string(settings)?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, settings, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                settings = excluded.settings,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&blob)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_or_default(user_id).await
    }

    /// Whether the user's stored role grants admin access
    pub async fn is_admin(&self, user_id: &str) -> StorageResult<bool> {
        Ok(self.get_or_default(user_id).await?.role == Role::Admin)
    }

    /// Users whose settings enable the daily journal schedule, with their
    /// configured "HH:MM" run time. Drives the scheduler loop.
    pub async fn list_scheduled_users(&self) -> StorageResult<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT user_id, settings FROM user_settings")
            .fetch_all(&self.pool)
            .await?;

        let mut scheduled = Vec::new();
        for row in &rows {
            let user_id: String = row.try_get("user_id")?;
            let blob: String = row.try_get("settings")?;
            let settings: UserSettings = serde_json::from_str(&blob)?;

            if settings.journal.auto_generation_enabled && settings.journal.daily_schedule_enabled {
                scheduled.push((user_id, settings.journal.schedule_time));
            }
        }

        Ok(scheduled)
    }
}
