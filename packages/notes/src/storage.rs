// ABOUTME: Note storage layer using SQLite
// ABOUTME: Owner-scoped CRUD with task links, text search, and batch operations

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use daybook_core::{prefixed_id, BatchOutcome};
use daybook_storage::{StorageError, StorageResult};

use crate::types::{Note, NoteBatchOp, NoteCreateInput, NoteStats, NoteUpdateInput};

pub struct NoteStorage {
    pool: SqlitePool,
}

impl NoteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List the owner's notes, newest first, keyset-paginated on (created_at, id)
    pub async fn list_notes(
        &self,
        owner: &str,
        include_archived: bool,
        project_id: Option<&str>,
        limit: i64,
        cursor: Option<(DateTime<Utc>, String)>,
    ) -> StorageResult<Vec<Note>> {
        debug!("Fetching notes for owner: {} (limit: {})", owner, limit);

        let mut query = String::from("SELECT * FROM notes WHERE created_by = ?");
        if !include_archived {
            query.push_str(" AND is_archived = 0");
        }
        if project_id.is_some() {
            query.push_str(" AND project_id = ?");
        }
        if cursor.is_some() {
            query.push_str(" AND (created_at < ? OR (created_at = ? AND id < ?))");
        }
        query.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");

        let mut q = sqlx::query(&query).bind(owner);
        if let Some(project_id) = project_id {
            q = q.bind(project_id);
        }
        if let Some((created_at, id)) = &cursor {
            q = q.bind(created_at).bind(created_at).bind(id);
        }
        q = q.bind(limit);

        let rows = q.fetch_all(&self.pool).await?;

        let mut notes = Vec::new();
        for row in &rows {
            notes.push(self.hydrate(row_to_note(row)?).await?);
        }
        Ok(notes)
    }

    pub async fn get_note(&self, owner: &str, note_id: &str) -> StorageResult<Note> {
        debug!("Fetching note: {}", note_id);

        let row = sqlx::query("SELECT * FROM notes WHERE id = ? AND created_by = ?")
            .bind(note_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)?;

        self.hydrate(row_to_note(&row)?).await
    }

    pub async fn create_note(&self, owner: &str, input: NoteCreateInput) -> StorageResult<Note> {
        let note_id = prefixed_id("note");
        let now = Utc::now();

        debug!("Creating note: {} for owner: {}", note_id, owner);

        if let Some(project_id) = &input.project_id {
            self.assert_project_owned(owner, project_id).await?;
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO notes (id, title, content, summary, project_id, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&note_id)
        .bind(&input.title)
        .bind(input.content.as_deref().unwrap_or(""))
        .bind(&input.summary)
        .bind(&input.project_id)
        .bind(owner)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if let Some(tags) = &input.tags {
            replace_tag_links(&mut tx, owner, &note_id, tags).await?;
        }

        tx.commit().await?;

        self.get_note(owner, &note_id).await
    }

    pub async fn update_note(
        &self,
        owner: &str,
        note_id: &str,
        input: NoteUpdateInput,
    ) -> StorageResult<Note> {
        debug!("Updating note: {}", note_id);

        if let Some(project_id) = &input.project_id {
            self.assert_project_owned(owner, project_id).await?;
        }

        let mut query_parts = vec!["updated_at = ?"];

        if input.title.is_some() {
            query_parts.push("title = ?");
        }
        if input.content.is_some() {
            query_parts.push("content = ?");
        }
        if input.summary.is_some() {
            query_parts.push("summary = ?");
        }
        if input.is_pinned.is_some() {
            query_parts.push("is_pinned = ?");
        }
        if input.project_id.is_some() {
            query_parts.push("project_id = ?");
        }

        let query_str = format!(
            "UPDATE notes SET {} WHERE id = ? AND created_by = ?",
            query_parts.join(", ")
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query(&query_str).bind(now);
        if let Some(title) = &input.title {
            query = query.bind(title);
        }
        if let Some(content) = &input.content {
            query = query.bind(content);
        }
        if let Some(summary) = &input.summary {
            query = query.bind(summary);
        }
        if let Some(is_pinned) = input.is_pinned {
            query = query.bind(is_pinned);
        }
        if let Some(project_id) = &input.project_id {
            query = query.bind(project_id);
        }

        let result = query.bind(note_id).bind(owner).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        if let Some(tags) = &input.tags {
            sqlx::query("DELETE FROM note_tags WHERE note_id = ?")
                .bind(note_id)
                .execute(&mut *tx)
                .await?;
            replace_tag_links(&mut tx, owner, note_id, tags).await?;
        }

        tx.commit().await?;

        self.get_note(owner, note_id).await
    }

    /// Hard delete; tag and task links cascade away
    pub async fn delete_note(&self, owner: &str, note_id: &str) -> StorageResult<()> {
        debug!("Deleting note: {}", note_id);

        let result = sqlx::query("DELETE FROM notes WHERE id = ? AND created_by = ?")
            .bind(note_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    pub async fn archive_note(&self, owner: &str, note_id: &str) -> StorageResult<Note> {
        debug!("Archiving note: {}", note_id);
        self.set_archived(owner, note_id, true).await
    }

    pub async fn unarchive_note(&self, owner: &str, note_id: &str) -> StorageResult<Note> {
        debug!("Unarchiving note: {}", note_id);
        self.set_archived(owner, note_id, false).await
    }

    /// Link the note to a task; both must belong to the owner
    pub async fn link_task(&self, owner: &str, note_id: &str, task_id: &str) -> StorageResult<Note> {
        debug!("Linking note {} to task {}", note_id, task_id);

        self.get_note(owner, note_id).await?;
        self.assert_task_owned(owner, task_id).await?;

        let result = sqlx::query("INSERT OR IGNORE INTO note_tasks (note_id, task_id) VALUES (?, ?)")
            .bind(note_id)
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(
                "Task is already linked to this note".to_string(),
            ));
        }

        self.get_note(owner, note_id).await
    }

    pub async fn unlink_task(
        &self,
        owner: &str,
        note_id: &str,
        task_id: &str,
    ) -> StorageResult<Note> {
        debug!("Unlinking note {} from task {}", note_id, task_id);

        self.get_note(owner, note_id).await?;

        let result = sqlx::query("DELETE FROM note_tasks WHERE note_id = ? AND task_id = ?")
            .bind(note_id)
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_note(owner, note_id).await
    }

    /// Case-insensitive substring search over title, content, and summary
    pub async fn search(&self, owner: &str, text: &str, limit: i64) -> StorageResult<Vec<Note>> {
        debug!("Searching notes for owner: {}", owner);

        let pattern = format!("%{}%", text);
        let rows = sqlx::query(
            r#"
            SELECT * FROM notes
            WHERE created_by = ? AND is_archived = 0
              AND (title LIKE ? OR content LIKE ? OR summary LIKE ?)
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(owner)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut notes = Vec::new();
        for row in &rows {
            notes.push(self.hydrate(row_to_note(row)?).await?);
        }
        Ok(notes)
    }

    pub async fn get_stats(&self, owner: &str) -> StorageResult<NoteStats> {
        debug!("Computing note stats for owner: {}", owner);

        let total_notes: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE created_by = ?")
                .bind(owner)
                .fetch_one(&self.pool)
                .await?;

        let pinned_notes: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notes WHERE created_by = ? AND is_pinned = 1",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        let archived_notes: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notes WHERE created_by = ? AND is_archived = 1",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        let notes_with_links: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT n.id) FROM notes n
            JOIN note_tasks nt ON nt.note_id = n.id
            WHERE n.created_by = ?
            "#,
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        Ok(NoteStats {
            total_notes,
            pinned_notes,
            archived_notes,
            notes_with_links,
        })
    }

    /// Apply one operation to many notes; rows that fail their guard are skipped
    pub async fn batch_operation(
        &self,
        owner: &str,
        ids: &[String],
        op: NoteBatchOp,
    ) -> StorageResult<BatchOutcome> {
        if let NoteBatchOp::Move(Some(project_id)) = &op {
            self.assert_project_owned(owner, project_id).await?;
        }

        let mut affected = 0;

        for id in ids {
            let result = match &op {
                NoteBatchOp::Archive => self.archive_note(owner, id).await.map(|_| ()),
                NoteBatchOp::Unarchive => self.unarchive_note(owner, id).await.map(|_| ()),
                NoteBatchOp::Delete => self.delete_note(owner, id).await,
                NoteBatchOp::Move(project_id) => self.move_note(owner, id, project_id.as_deref()).await,
            };

            match result {
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

    async fn move_note(
        &self,
        owner: &str,
        note_id: &str,
        project_id: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE notes SET project_id = ?, updated_at = ? WHERE id = ? AND created_by = ?",
        )
        .bind(project_id)
        .bind(now)
        .bind(note_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_archived(&self, owner: &str, note_id: &str, archived: bool) -> StorageResult<Note> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE notes SET is_archived = ?, updated_at = ? WHERE id = ? AND created_by = ?",
        )
        .bind(archived)
        .bind(now)
        .bind(note_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_note(owner, note_id).await
    }

    async fn hydrate(&self, mut note: Note) -> StorageResult<Note> {
        let tag_rows = sqlx::query(
            r#"
            SELECT t.id FROM tags t
            JOIN note_tags nt ON nt.tag_id = t.id
            WHERE nt.note_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(&note.id)
        .fetch_all(&self.pool)
        .await?;
        for row in &tag_rows {
            note.tags.push(row.try_get("id")?);
        }

        let task_rows =
            sqlx::query("SELECT task_id FROM note_tasks WHERE note_id = ? ORDER BY task_id")
                .bind(&note.id)
                .fetch_all(&self.pool)
                .await?;
        for row in &task_rows {
            note.linked_tasks.push(row.try_get("task_id")?);
        }

        Ok(note)
    }

    async fn assert_project_owned(&self, owner: &str, project_id: &str) -> StorageResult<()> {
        let exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE id = ? AND created_by = ?")
                .bind(project_id)
                .bind(owner)
                .fetch_one(&self.pool)
                .await?;

        if exists == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn assert_task_owned(&self, owner: &str, task_id: &str) -> StorageResult<()> {
        let exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE id = ? AND created_by = ?")
                .bind(task_id)
                .bind(owner)
                .fetch_one(&self.pool)
                .await?;

        if exists == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

/// Link the note to each tag the owner actually has; foreign ids are ignored
async fn replace_tag_links(
    tx: &mut SqliteConnection,
    owner: &str,
    note_id: &str,
    tag_ids: &[String],
) -> StorageResult<()> {
    for tag_id in tag_ids {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO note_tags (note_id, tag_id)
            SELECT ?, id FROM tags WHERE id = ? AND created_by = ?
            "#,
        )
        .bind(note_id)
        .bind(tag_id)
        .bind(owner)
        .execute(&mut *tx)
        .await?;
    }

    Ok(())
}

fn row_to_note(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Note> {
    Ok(Note {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        summary: row.try_get("summary")?,
        is_pinned: row.try_get("is_pinned")?,
        is_archived: row.try_get("is_archived")?,
        project_id: row.try_get("project_id")?,
        tags: Vec::new(),
        linked_tasks: Vec::new(),
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
