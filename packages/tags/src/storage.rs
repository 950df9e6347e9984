// ABOUTME: Tag storage layer using SQLite
// ABOUTME: Owner-scoped CRUD with system-tag protection and usage statistics

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use daybook_core::{prefixed_id, BatchOutcome};
use daybook_storage::{conflict_on_unique, StorageError, StorageResult};

use crate::types::{Tag, TagCreateInput, TagKindCount, TagStats, TagUpdateInput, TagUsage};

/// Context tags seeded for every new user; marked system so they cannot be deleted
const SYSTEM_TAGS: &[(&str, &str)] = &[
    ("@home", "context"),
    ("@work", "context"),
    ("@errands", "context"),
    ("@calls", "context"),
];

pub struct TagStorage {
    pool: SqlitePool,
}

impl TagStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List the owner's tags ordered by name, keyset-paginated on (name, id)
    pub async fn list_tags(
        &self,
        owner: &str,
        limit: i64,
        cursor: Option<(String, String)>,
    ) -> StorageResult<Vec<Tag>> {
        debug!("Fetching tags for owner: {} (limit: {})", owner, limit);

        let mut query = String::from("SELECT * FROM tags WHERE created_by = ?");
        if cursor.is_some() {
            query.push_str(" AND (name > ? OR (name = ? AND id > ?))");
        }
        query.push_str(" ORDER BY name, id LIMIT ?");

        let mut q = sqlx::query(&query).bind(owner);
        if let Some((name, id)) = &cursor {
            q = q.bind(name).bind(name).bind(id);
        }
        q = q.bind(limit);

        let rows = q.fetch_all(&self.pool).await?;

        rows.iter().map(row_to_tag).collect()
    }

    /// Get a single tag; a tag owned by someone else is indistinguishable from a missing one
    pub async fn get_tag(&self, owner: &str, tag_id: &str) -> StorageResult<Tag> {
        debug!("Fetching tag: {}", tag_id);

        let row = sqlx::query("SELECT * FROM tags WHERE id = ? AND created_by = ?")
            .bind(tag_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)?;

        row_to_tag(&row)
    }

    /// Create a new tag
    pub async fn create_tag(&self, owner: &str, input: TagCreateInput) -> StorageResult<Tag> {
        let tag_id = prefixed_id("tag");
        let now = Utc::now();
        let kind = input.kind.unwrap_or_default();

        debug!("Creating tag: {} (name: {})", tag_id, input.name);

        sqlx::query(
            r#"
            INSERT INTO tags (id, name, kind, color, icon, category, description, is_system, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&tag_id)
        .bind(&input.name)
        .bind(kind)
        .bind(&input.color)
        .bind(&input.icon)
        .bind(&input.category)
        .bind(&input.description)
        .bind(owner)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("Tag '{}' already exists", input.name)))?;

        self.get_tag(owner, &tag_id).await
    }

    /// Update a tag
    pub async fn update_tag(
        &self,
        owner: &str,
        tag_id: &str,
        input: TagUpdateInput,
    ) -> StorageResult<Tag> {
        debug!("Updating tag: {}", tag_id);

        // Build update query dynamically based on provided fields
        let mut query_parts = Vec::new();

        if input.name.is_some() {
            query_parts.push("name = ?");
        }
        if input.color.is_some() {
            query_parts.push("color = ?");
        }
        if input.icon.is_some() {
            query_parts.push("icon = ?");
        }
        if input.category.is_some() {
            query_parts.push("category = ?");
        }
        if input.description.is_some() {
            query_parts.push("description = ?");
        }

        if query_parts.is_empty() {
            return self.get_tag(owner, tag_id).await;
        }

        let query_str = format!(
            "UPDATE tags SET {} WHERE id = ? AND created_by = ?",
            query_parts.join(", ")
        );
        let mut query = sqlx::query(&query_str);

        // Bind parameters in the same order
        let duplicate_name = input.name.clone();
        if let Some(name) = input.name {
            query = query.bind(name);
        }
        if let Some(color) = input.color {
            query = query.bind(color);
        }
        if let Some(icon) = input.icon {
            query = query.bind(icon);
        }
        if let Some(category) = input.category {
            query = query.bind(category);
        }
        if let Some(description) = input.description {
            query = query.bind(description);
        }

        let result = query
            .bind(tag_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let name = duplicate_name.unwrap_or_default();
                conflict_on_unique(e, format!("Tag '{}' already exists", name))
            })?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_tag(owner, tag_id).await
    }

    /// Delete a tag permanently (only non-system tags no tasks or notes are using)
    pub async fn delete_tag(&self, owner: &str, tag_id: &str) -> StorageResult<()> {
        debug!("Deleting tag: {}", tag_id);

        let tag = self.get_tag(owner, tag_id).await?;

        if tag.is_system {
            return Err(StorageError::InvalidState(format!(
                "Tag '{}' is a system tag and cannot be deleted",
                tag.name
            )));
        }

        let (task_count, note_count) = self.usage_counts(tag_id).await?;
        if task_count > 0 || note_count > 0 {
            return Err(StorageError::InvalidState(format!(
                "Cannot delete tag '{}': {} tasks and {} notes are using it",
                tag.name, task_count, note_count
            )));
        }

        sqlx::query("DELETE FROM tags WHERE id = ? AND created_by = ?")
            .bind(tag_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete many tags; ids that fail their delete guard are skipped
    pub async fn batch_delete(&self, owner: &str, ids: &[String]) -> StorageResult<BatchOutcome> {
        let mut affected = 0;

        for id in ids {
            match self.delete_tag(owner, id).await {
                Ok(()) => affected += 1,
                Err(StorageError::NotFound | StorageError::InvalidState(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(BatchOutcome {
            requested: ids.len(),
            affected,
        })
    }

    /// Usage statistics across the owner's tags
    pub async fn get_stats(&self, owner: &str) -> StorageResult<TagStats> {
        debug!("Computing tag stats for owner: {}", owner);

        let total_tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE created_by = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        let system_tags: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE created_by = ? AND is_system = 1")
                .bind(owner)
                .fetch_one(&self.pool)
                .await?;

        let kind_rows = sqlx::query(
            "SELECT kind, COUNT(*) as count FROM tags WHERE created_by = ? GROUP BY kind",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        let mut kind_counts = Vec::new();
        for row in &kind_rows {
            kind_counts.push(TagKindCount {
                kind: row.try_get("kind")?,
                count: row.try_get("count")?,
            });
        }

        let usage_rows = sqlx::query(
            r#"
            SELECT
                t.id,
                t.name,
                (SELECT COUNT(*) FROM task_tags tt WHERE tt.tag_id = t.id) as task_count,
                (SELECT COUNT(*) FROM note_tags nt WHERE nt.tag_id = t.id) as note_count
            FROM tags t
            WHERE t.created_by = ?
            ORDER BY task_count + note_count DESC, t.name
            LIMIT 10
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        let mut most_used = Vec::new();
        for row in &usage_rows {
            most_used.push(TagUsage {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                task_count: row.try_get("task_count")?,
                note_count: row.try_get("note_count")?,
            });
        }

        Ok(TagStats {
            total_tags,
            system_tags,
            kind_counts,
            most_used,
        })
    }

    /// Seed the default system context tags for a new user (idempotent)
    pub async fn ensure_system_tags(&self, owner: &str) -> StorageResult<()> {
        for (name, kind) in SYSTEM_TAGS {
            let now = Utc::now();
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO tags (id, name, kind, is_system, created_by, created_at)
                VALUES (?, ?, ?, 1, ?, ?)
                "#,
            )
            .bind(prefixed_id("tag"))
            .bind(name)
            .bind(kind)
            .bind(owner)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn usage_counts(&self, tag_id: &str) -> StorageResult<(i64, i64)> {
        let task_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM task_tags WHERE tag_id = ?")
                .bind(tag_id)
                .fetch_one(&self.pool)
                .await?;

        let note_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM note_tags WHERE tag_id = ?")
                .bind(tag_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((task_count, note_count))
    }
}

/// Convert a database row to a Tag
fn row_to_tag(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        kind: row.try_get("kind")?,
        color: row.try_get("color")?,
        icon: row.try_get("icon")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        is_system: row.try_get("is_system")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}
