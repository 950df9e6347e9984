// ABOUTME: Project storage layer using SQLite
// ABOUTME: Owner-scoped CRUD with archive support and non-empty delete guard

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use daybook_core::{prefixed_id, BatchOutcome};
use daybook_storage::{conflict_on_unique, StorageError, StorageResult};

use crate::types::{
    Project, ProjectBatchOp, ProjectCreateInput, ProjectStats, ProjectStatusCount,
    ProjectUpdateInput,
};

pub struct ProjectStorage {
    pool: SqlitePool,
}

impl ProjectStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List the owner's projects, newest first, keyset-paginated on (created_at, id)
    pub async fn list_projects(
        &self,
        owner: &str,
        include_archived: bool,
        limit: i64,
        cursor: Option<(DateTime<Utc>, String)>,
    ) -> StorageResult<Vec<Project>> {
        debug!(
            "Fetching projects for owner: {} (include_archived: {}, limit: {})",
            owner, include_archived, limit
        );

        let mut query = String::from("SELECT * FROM projects WHERE created_by = ?");
        if !include_archived {
            query.push_str(" AND is_archived = 0");
        }
        if cursor.is_some() {
            query.push_str(" AND (created_at < ? OR (created_at = ? AND id < ?))");
        }
        query.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");

        let mut q = sqlx::query(&query).bind(owner);
        if let Some((created_at, id)) = &cursor {
            q = q.bind(created_at).bind(created_at).bind(id);
        }
        q = q.bind(limit);

        let rows = q.fetch_all(&self.pool).await?;

        rows.iter().map(row_to_project).collect()
    }

    pub async fn get_project(&self, owner: &str, project_id: &str) -> StorageResult<Project> {
        debug!("Fetching project: {}", project_id);

        let row = sqlx::query("SELECT * FROM projects WHERE id = ? AND created_by = ?")
            .bind(project_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)?;

        row_to_project(&row)
    }

    /// Create a new project; the name must be unique among the owner's active projects
    pub async fn create_project(
        &self,
        owner: &str,
        input: ProjectCreateInput,
    ) -> StorageResult<Project> {
        let project_id = prefixed_id("proj");
        let now = Utc::now();

        debug!("Creating project: {} (name: {})", project_id, input.name);

        sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, color, is_archived, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&project_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.color)
        .bind(owner)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(e, format!("An active project named '{}' already exists", input.name))
        })?;

        self.get_project(owner, &project_id).await
    }

    pub async fn update_project(
        &self,
        owner: &str,
        project_id: &str,
        input: ProjectUpdateInput,
    ) -> StorageResult<Project> {
        debug!("Updating project: {}", project_id);

        let mut query_parts = vec!["updated_at = ?"];

        if input.name.is_some() {
            query_parts.push("name = ?");
        }
        if input.description.is_some() {
            query_parts.push("description = ?");
        }
        if input.color.is_some() {
            query_parts.push("color = ?");
        }

        let query_str = format!(
            "UPDATE projects SET {} WHERE id = ? AND created_by = ?",
            query_parts.join(", ")
        );

        let now = Utc::now();
        let mut query = sqlx::query(&query_str).bind(now);

        let duplicate_name = input.name.clone();
        if let Some(name) = input.name {
            query = query.bind(name);
        }
        if let Some(description) = input.description {
            query = query.bind(description);
        }
        if let Some(color) = input.color {
            query = query.bind(color);
        }

        let result = query
            .bind(project_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let name = duplicate_name.unwrap_or_default();
                conflict_on_unique(e, format!("An active project named '{}' already exists", name))
            })?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_project(owner, project_id).await
    }

    /// Soft-delete: archived projects free up their name for reuse
    pub async fn archive_project(&self, owner: &str, project_id: &str) -> StorageResult<Project> {
        debug!("Archiving project: {}", project_id);
        self.set_archived(owner, project_id, true).await
    }

    pub async fn unarchive_project(&self, owner: &str, project_id: &str) -> StorageResult<Project> {
        debug!("Unarchiving project: {}", project_id);
        self.set_archived(owner, project_id, false).await
    }

    /// Delete a project permanently; rejected while it still owns tasks or notes
    pub async fn delete_project(&self, owner: &str, project_id: &str) -> StorageResult<()> {
        debug!("Deleting project: {}", project_id);

        // Ownership check first so foreign ids surface as NotFound
        self.get_project(owner, project_id).await?;

        let task_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;

        let note_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;

        if task_count > 0 || note_count > 0 {
            return Err(StorageError::InvalidState(format!(
                "Cannot delete project: it still owns {} tasks and {} notes",
                task_count, note_count
            )));
        }

        sqlx::query("DELETE FROM projects WHERE id = ? AND created_by = ?")
            .bind(project_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Apply one operation to many projects; rows that fail their guard are skipped
    pub async fn batch_operation(
        &self,
        owner: &str,
        ids: &[String],
        op: ProjectBatchOp,
    ) -> StorageResult<BatchOutcome> {
        let mut affected = 0;

        for id in ids {
            let result = match op {
                ProjectBatchOp::Archive => self.archive_project(owner, id).await.map(|_| ()),
                ProjectBatchOp::Unarchive => self.unarchive_project(owner, id).await.map(|_| ()),
                ProjectBatchOp::Delete => self.delete_project(owner, id).await,
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

    /// Task/note/time rollup for one project
    pub async fn get_stats(&self, owner: &str, project_id: &str) -> StorageResult<ProjectStats> {
        debug!("Computing stats for project: {}", project_id);

        self.get_project(owner, project_id).await?;

        let status_rows = sqlx::query(
            "SELECT status, COUNT(*) as count FROM tasks WHERE project_id = ? GROUP BY status",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let mut status_counts = Vec::new();
        let mut total_tasks = 0;
        let mut completed_tasks = 0;
        for row in &status_rows {
            let status: String = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            total_tasks += count;
            if status == "done" {
                completed_tasks = count;
            }
            status_counts.push(ProjectStatusCount { status, count });
        }

        let total_notes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;

        let total_time_seconds: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_time_seconds), 0) FROM tasks WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProjectStats {
            total_tasks,
            completed_tasks,
            status_counts,
            total_notes,
            total_time_seconds,
        })
    }

    async fn set_archived(
        &self,
        owner: &str,
        project_id: &str,
        archived: bool,
    ) -> StorageResult<Project> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE projects SET is_archived = ?, updated_at = ? WHERE id = ? AND created_by = ?",
        )
        .bind(archived)
        .bind(now)
        .bind(project_id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "An active project with this name already exists"))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_project(owner, project_id).await
    }
}

/// Convert a database row to a Project
fn row_to_project(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Project> {
    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        color: row.try_get("color")?,
        is_archived: row.try_get("is_archived")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
