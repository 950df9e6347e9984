// ABOUTME: Task storage layer using SQLite
// ABOUTME: Status machine with history, timer accounting, recurrence instances, stats

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use daybook_core::prefixed_id;
use daybook_storage::{StorageError, StorageResult};

use crate::recurrence::RecurrencePattern;
use crate::types::{
    PriorityCount, StatusCount, StatusHistoryEntry, Task, TaskCreateInput, TaskFilter, TaskKind,
    TaskStats, TaskStatus, TaskUpdateInput, TimeEntry,
};

pub struct TaskStorage {
    pool: SqlitePool,
}

impl TaskStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List the owner's tasks, newest first, keyset-paginated on (created_at, id)
    pub async fn list_tasks(
        &self,
        owner: &str,
        filter: &TaskFilter,
        limit: i64,
        cursor: Option<(DateTime<Utc>, String)>,
    ) -> StorageResult<Vec<Task>> {
        debug!("Fetching tasks for owner: {} (limit: {})", owner, limit);

        let mut query = String::from("SELECT * FROM tasks WHERE created_by = ?");

        if filter.status.is_some() {
            query.push_str(" AND status = ?");
        } else if !filter.include_archived {
            query.push_str(" AND status != 'archived'");
        }
        if filter.priority.is_some() {
            query.push_str(" AND priority = ?");
        }
        if filter.project_id.is_some() {
            query.push_str(" AND project_id = ?");
        }
        if filter.due_from.is_some() {
            query.push_str(" AND due_at >= ?");
        }
        if filter.due_to.is_some() {
            query.push_str(" AND due_at < ?");
        }
        if filter.completed_from.is_some() {
            query.push_str(" AND completed_at >= ?");
        }
        if filter.completed_to.is_some() {
            query.push_str(" AND completed_at < ?");
        }
        if filter.search.is_some() {
            query.push_str(" AND (title LIKE ? OR description LIKE ?)");
        }
        if cursor.is_some() {
            query.push_str(" AND (created_at < ? OR (created_at = ? AND id < ?))");
        }
        query.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");

        let mut q = sqlx::query(&query).bind(owner);
        if let Some(status) = &filter.status {
            q = q.bind(status);
        }
        if let Some(priority) = &filter.priority {
            q = q.bind(priority);
        }
        if let Some(project_id) = &filter.project_id {
            q = q.bind(project_id);
        }
        if let Some(due_from) = &filter.due_from {
            q = q.bind(due_from);
        }
        if let Some(due_to) = &filter.due_to {
            q = q.bind(due_to);
        }
        if let Some(completed_from) = &filter.completed_from {
            q = q.bind(completed_from);
        }
        if let Some(completed_to) = &filter.completed_to {
            q = q.bind(completed_to);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            q = q.bind(pattern.clone()).bind(pattern);
        }
        if let Some((created_at, id)) = &cursor {
            q = q.bind(created_at).bind(created_at).bind(id);
        }
        q = q.bind(limit);

        let rows = q.fetch_all(&self.pool).await?;

        let mut tasks = Vec::new();
        for row in &rows {
            let mut task = row_to_task(row)?;
            task.tags = self.load_tag_ids(&task.id).await?;
            tasks.push(task);
        }

        Ok(tasks)
    }

    /// Get a single task; a task owned by someone else is indistinguishable from a missing one
    pub async fn get_task(&self, owner: &str, task_id: &str) -> StorageResult<Task> {
        debug!("Fetching task: {}", task_id);

        let row = sqlx::query("SELECT * FROM tasks WHERE id = ? AND created_by = ?")
            .bind(task_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)?;

        let mut task = row_to_task(&row)?;
        task.tags = self.load_tag_ids(&task.id).await?;
        Ok(task)
    }

    /// Create a new task with its creation history row
    pub async fn create_task(&self, owner: &str, input: TaskCreateInput) -> StorageResult<Task> {
        let task_id = prefixed_id("task");
        let now = Utc::now();
        let kind = input.kind.unwrap_or_default();
        let status = input.status.unwrap_or(match kind {
            TaskKind::Idea => TaskStatus::Idea,
            _ => TaskStatus::Todo,
        });

        debug!("Creating task: {} for owner: {}", task_id, owner);

        if let Some(project_id) = &input.project_id {
            self.assert_project_owned(owner, project_id).await?;
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, title, description, kind, status, priority, due_at,
                project_id, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(kind)
        .bind(status)
        .bind(input.priority)
        .bind(input.due_at)
        .bind(&input.project_id)
        .bind(owner)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if let Some(tags) = &input.tags {
            replace_tag_links(&mut tx, owner, &task_id, tags).await?;
        }

        append_history(&mut tx, &task_id, None, status, None, owner, now).await?;

        tx.commit().await?;

        self.get_task(owner, &task_id).await
    }

    /// Update task fields; status changes must go through `update_status`
    pub async fn update_task(
        &self,
        owner: &str,
        task_id: &str,
        input: TaskUpdateInput,
    ) -> StorageResult<Task> {
        debug!("Updating task: {}", task_id);

        if let Some(project_id) = &input.project_id {
            self.assert_project_owned(owner, project_id).await?;
        }

        let mut query_parts = vec!["updated_at = ?"];

        if input.title.is_some() {
            query_parts.push("title = ?");
        }
        if input.description.is_some() {
            query_parts.push("description = ?");
        }
        if input.kind.is_some() {
            query_parts.push("kind = ?");
        }
        if input.priority.is_some() {
            query_parts.push("priority = ?");
        }
        if input.due_at.is_some() {
            query_parts.push("due_at = ?");
        }
        if input.project_id.is_some() {
            query_parts.push("project_id = ?");
        }

        let query_str = format!(
            "UPDATE tasks SET {} WHERE id = ? AND created_by = ?",
            query_parts.join(", ")
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query(&query_str).bind(now);
        if let Some(title) = &input.title {
            query = query.bind(title);
        }
        if let Some(description) = &input.description {
            query = query.bind(description);
        }
        if let Some(kind) = input.kind {
            query = query.bind(kind);
        }
        if let Some(priority) = input.priority {
            query = query.bind(priority);
        }
        if let Some(due_at) = input.due_at {
            query = query.bind(due_at);
        }
        if let Some(project_id) = &input.project_id {
            query = query.bind(project_id);
        }

        let result = query.bind(task_id).bind(owner).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        if let Some(tags) = &input.tags {
            sqlx::query("DELETE FROM task_tags WHERE task_id = ?")
                .bind(task_id)
                .execute(&mut *tx)
                .await?;
            replace_tag_links(&mut tx, owner, task_id, tags).await?;
        }

        tx.commit().await?;

        self.get_task(owner, task_id).await
    }

    /// Hard delete; history, time entries, and tag links cascade away
    pub async fn delete_task(&self, owner: &str, task_id: &str) -> StorageResult<()> {
        debug!("Deleting task: {}", task_id);

        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND created_by = ?")
            .bind(task_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    /// Explicit status write. Any transition is accepted; a no-op (same
    /// status) returns the task untouched with no history row.
    pub async fn update_status(
        &self,
        owner: &str,
        task_id: &str,
        new_status: TaskStatus,
        note: Option<String>,
    ) -> StorageResult<Task> {
        let task = self.get_task(owner, task_id).await?;

        if task.status == new_status {
            return Ok(task);
        }

        debug!(
            "Task {} transition: {:?} -> {:?}",
            task_id, task.status, new_status
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        apply_transition(&mut tx, &task, new_status, note, owner, now).await?;
        tx.commit().await?;

        self.get_task(owner, task_id).await
    }

    /// Move a DONE or ARCHIVED task back into play
    pub async fn restart_task(
        &self,
        owner: &str,
        task_id: &str,
        to_status: Option<TaskStatus>,
    ) -> StorageResult<Task> {
        let task = self.get_task(owner, task_id).await?;

        if !task.status.is_terminal() {
            return Err(StorageError::InvalidState(format!(
                "Only done or archived tasks can be restarted (task is {:?})",
                task.status
            )));
        }

        let to_status = to_status.unwrap_or(TaskStatus::Todo);
        if to_status.is_terminal() {
            return Err(StorageError::InvalidState(
                "A task cannot be restarted into done or archived".to_string(),
            ));
        }

        debug!("Restarting task {} to {:?}", task_id, to_status);

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        apply_transition(&mut tx, &task, to_status, None, owner, now).await?;
        tx.commit().await?;

        self.get_task(owner, task_id).await
    }

    pub async fn archive_task(&self, owner: &str, task_id: &str) -> StorageResult<Task> {
        let task = self.get_task(owner, task_id).await?;

        if task.status == TaskStatus::Archived {
            return Err(StorageError::InvalidState(
                "Task is already archived".to_string(),
            ));
        }

        debug!("Archiving task: {}", task_id);

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        apply_transition(&mut tx, &task, TaskStatus::Archived, None, owner, now).await?;
        tx.commit().await?;

        self.get_task(owner, task_id).await
    }

    /// Start the task's timer. Force-closes any other running timer of the
    /// same owner first, so at most one timer runs per user system-wide.
    /// An IDEA task is promoted to IN_PROGRESS, with its own history row.
    pub async fn start_timer(&self, owner: &str, task_id: &str) -> StorageResult<Task> {
        let task = self.get_task(owner, task_id).await?;

        if task.is_timer_active {
            return Err(StorageError::InvalidState(
                "A timer is already running on this task".to_string(),
            ));
        }
        if task.status.is_terminal() {
            return Err(StorageError::InvalidState(format!(
                "Cannot start a timer on a {:?} task",
                task.status
            )));
        }

        debug!("Starting timer on task: {}", task_id);

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        force_close_timers(&mut tx, owner, now).await?;

        let promote = task.status == TaskStatus::Idea;
        if promote {
            sqlx::query(
                "UPDATE tasks SET is_timer_active = 1, timer_started_at = ?, status = ?, updated_at = ? WHERE id = ?",
            )
            .bind(now)
            .bind(TaskStatus::InProgress)
            .bind(now)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

            append_history(
                &mut tx,
                task_id,
                Some(TaskStatus::Idea),
                TaskStatus::InProgress,
                Some("timer started".to_string()),
                owner,
                now,
            )
            .await?;
        } else {
            sqlx::query(
                "UPDATE tasks SET is_timer_active = 1, timer_started_at = ?, updated_at = ? WHERE id = ?",
            )
            .bind(now)
            .bind(now)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO time_entries (id, task_id, started_at, created_by, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(prefixed_id("entry"))
        .bind(task_id)
        .bind(now)
        .bind(owner)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_task(owner, task_id).await
    }

    /// Close the running timer and add the elapsed whole seconds to the
    /// task's accumulated total. Status is left unchanged.
    pub async fn pause_timer(&self, owner: &str, task_id: &str) -> StorageResult<Task> {
        let task = self.get_task(owner, task_id).await?;

        let started_at = match (task.is_timer_active, task.timer_started_at) {
            (true, Some(started_at)) => started_at,
            _ => {
                return Err(StorageError::InvalidState(
                    "No timer is running on this task".to_string(),
                ))
            }
        };

        debug!("Pausing timer on task: {}", task_id);

        let now = Utc::now();
        let elapsed = (now - started_at).num_seconds().max(0);

        let mut tx = self.pool.begin().await?;
        close_open_entry(&mut tx, task_id, now, elapsed).await?;
        sqlx::query(
            r#"
            UPDATE tasks
            SET is_timer_active = 0,
                timer_started_at = NULL,
                total_time_seconds = total_time_seconds + ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(elapsed)
        .bind(now)
        .bind(task_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.get_task(owner, task_id).await
    }

    /// Pause accounting plus a transition to DONE in one transaction
    pub async fn stop_timer(&self, owner: &str, task_id: &str) -> StorageResult<Task> {
        let task = self.get_task(owner, task_id).await?;

        let started_at = match (task.is_timer_active, task.timer_started_at) {
            (true, Some(started_at)) => started_at,
            _ => {
                return Err(StorageError::InvalidState(
                    "No timer is running on this task".to_string(),
                ))
            }
        };

        debug!("Stopping timer on task: {}", task_id);

        let now = Utc::now();
        let elapsed = (now - started_at).num_seconds().max(0);

        let mut tx = self.pool.begin().await?;
        close_open_entry(&mut tx, task_id, now, elapsed).await?;
        sqlx::query(
            r#"
            UPDATE tasks
            SET is_timer_active = 0,
                timer_started_at = NULL,
                total_time_seconds = total_time_seconds + ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(elapsed)
        .bind(now)
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

        // Reload inside the paused state so the DONE transition sees a stopped timer
        let mut paused = task;
        paused.is_timer_active = false;
        paused.timer_started_at = None;
        apply_transition(&mut tx, &paused, TaskStatus::Done, None, owner, now).await?;

        tx.commit().await?;

        self.get_task(owner, task_id).await
    }

    /// Toggle recurrence. `None` clears the flag and pattern.
    pub async fn set_recurring(
        &self,
        owner: &str,
        task_id: &str,
        pattern: Option<RecurrencePattern>,
    ) -> StorageResult<Task> {
        self.get_task(owner, task_id).await?;

        if let Some(pattern) = &pattern {
            if pattern.interval() == 0 {
                return Err(StorageError::InvalidState(
                    "Recurrence interval must be at least 1".to_string(),
                ));
            }
        }

        debug!("Setting recurrence on task: {}", task_id);

        let now = Utc::now();
        let encoded = match &pattern {
            Some(p) => Some(serde_json::to_string(p)?),
            None => None,
        };

        sqlx::query(
            "UPDATE tasks SET is_recurring = ?, recurrence = ?, updated_at = ? WHERE id = ? AND created_by = ?",
        )
        .bind(pattern.is_some())
        .bind(encoded)
        .bind(now)
        .bind(task_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        self.get_task(owner, task_id).await
    }

    /// Create the next instance of a recurring task: same
    /// title/description/kind/priority/project/tags, linked back to the
    /// source, due one recurrence period from now, starting in TODO.
    pub async fn generate_next_instance(&self, owner: &str, task_id: &str) -> StorageResult<Task> {
        let source = self.get_task(owner, task_id).await?;

        let pattern = match (&source.is_recurring, &source.recurrence) {
            (true, Some(pattern)) => pattern.clone(),
            _ => {
                return Err(StorageError::InvalidState(
                    "Task is not recurring or has no recurrence pattern".to_string(),
                ))
            }
        };

        let now = Utc::now();
        let next_due = pattern.next_occurrence(now);
        let new_id = prefixed_id("task");

        debug!(
            "Generating next instance {} of recurring task {}",
            new_id, task_id
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, title, description, kind, status, priority, due_at,
                is_recurring, recurrence, parent_task_id, project_id,
                created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_id)
        .bind(&source.title)
        .bind(&source.description)
        .bind(source.kind)
        .bind(TaskStatus::Todo)
        .bind(source.priority)
        .bind(next_due)
        .bind(source.is_recurring)
        .bind(serde_json::to_string(&pattern)?)
        .bind(&source.id)
        .bind(&source.project_id)
        .bind(owner)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        replace_tag_links(&mut tx, owner, &new_id, &source.tags).await?;
        append_history(&mut tx, &new_id, None, TaskStatus::Todo, None, owner, now).await?;

        tx.commit().await?;

        self.get_task(owner, &new_id).await
    }

    pub async fn get_time_entries(
        &self,
        owner: &str,
        task_id: &str,
    ) -> StorageResult<Vec<TimeEntry>> {
        self.get_task(owner, task_id).await?;

        let rows =
            sqlx::query("SELECT * FROM time_entries WHERE task_id = ? ORDER BY started_at")
                .bind(task_id)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_time_entry).collect()
    }

    /// The append-only status audit trail, oldest first
    pub async fn get_status_history(
        &self,
        owner: &str,
        task_id: &str,
    ) -> StorageResult<Vec<StatusHistoryEntry>> {
        self.get_task(owner, task_id).await?;

        let rows = sqlx::query(
            "SELECT * FROM task_status_history WHERE task_id = ? ORDER BY changed_at, id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_history).collect()
    }

    /// Dashboard rollup over tasks created in the (optional) range
    pub async fn get_stats(
        &self,
        owner: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StorageResult<TaskStats> {
        debug!("Computing task stats for owner: {}", owner);

        let mut range = String::new();
        if from.is_some() {
            range.push_str(" AND created_at >= ?");
        }
        if to.is_some() {
            range.push_str(" AND created_at < ?");
        }

        let status_query = format!(
            "SELECT status, COUNT(*) as count FROM tasks WHERE created_by = ?{} GROUP BY status",
            range
        );
        let mut q = sqlx::query(&status_query).bind(owner);
        if let Some(from) = &from {
            q = q.bind(from);
        }
        if let Some(to) = &to {
            q = q.bind(to);
        }
        let status_rows = q.fetch_all(&self.pool).await?;

        let mut status_counts = Vec::new();
        let mut total_tasks = 0;
        let mut completed_tasks = 0;
        for row in &status_rows {
            let status: TaskStatus = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            total_tasks += count;
            if status == TaskStatus::Done {
                completed_tasks = count;
            }
            status_counts.push(StatusCount { status, count });
        }

        let priority_query = format!(
            "SELECT priority, COUNT(*) as count FROM tasks WHERE created_by = ? AND priority IS NOT NULL{} GROUP BY priority",
            range
        );
        let mut q = sqlx::query(&priority_query).bind(owner);
        if let Some(from) = &from {
            q = q.bind(from);
        }
        if let Some(to) = &to {
            q = q.bind(to);
        }
        let priority_rows = q.fetch_all(&self.pool).await?;

        let mut priority_counts = Vec::new();
        for row in &priority_rows {
            priority_counts.push(PriorityCount {
                priority: row.try_get("priority")?,
                count: row.try_get("count")?,
            });
        }

        let time_query = format!(
            "SELECT COALESCE(SUM(total_time_seconds), 0) FROM tasks WHERE created_by = ?{}",
            range
        );
        let mut q = sqlx::query_scalar(&time_query).bind(owner);
        if let Some(from) = &from {
            q = q.bind(from);
        }
        if let Some(to) = &to {
            q = q.bind(to);
        }
        let total_time_seconds: i64 = q.fetch_one(&self.pool).await?;

        let completion_rate = if total_tasks > 0 {
            completed_tasks as f64 / total_tasks as f64
        } else {
            0.0
        };

        Ok(TaskStats {
            total_tasks,
            completed_tasks,
            completion_rate,
            status_counts,
            priority_counts,
            total_time_seconds,
        })
    }

    /// The owner's tasks completed within [from, to); feeds journal generation
    pub async fn list_completed_in_range(
        &self,
        owner: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<Task>> {
        let filter = TaskFilter {
            completed_from: Some(from),
            completed_to: Some(to),
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        let mut tasks = self.list_tasks(owner, &filter, i64::MAX, None).await?;
        tasks.sort_by(|a, b| a.completed_at.cmp(&b.completed_at));
        Ok(tasks)
    }

    async fn load_tag_ids(&self, task_id: &str) -> StorageResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id FROM tags t
            JOIN task_tags tt ON tt.tag_id = t.id
            WHERE tt.task_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        let mut ids = Vec::new();
        for row in &rows {
            ids.push(row.try_get("id")?);
        }
        Ok(ids)
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
}

/// Apply a status transition and its side effects, appending the history row.
/// Callers have already ruled out no-ops.
async fn apply_transition(
    tx: &mut SqliteConnection,
    task: &Task,
    new_status: TaskStatus,
    note: Option<String>,
    actor: &str,
    now: DateTime<Utc>,
) -> StorageResult<()> {
    if new_status == TaskStatus::Done {
        // Entering DONE force-stops the timer without pause accounting
        if task.is_timer_active {
            if let Some(started_at) = task.timer_started_at {
                let elapsed = (now - started_at).num_seconds().max(0);
                close_open_entry(tx, &task.id, now, elapsed).await?;
            }
        }

        sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?,
                completed_at = ?,
                completed_count = completed_count + 1,
                is_timer_active = 0,
                timer_started_at = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(new_status)
        .bind(now)
        .bind(now)
        .bind(&task.id)
        .execute(&mut *tx)
        .await?;
    } else if task.status == TaskStatus::Done {
        // Leaving DONE clears the completion stamp
        sqlx::query(
            "UPDATE tasks SET status = ?, completed_at = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(new_status)
        .bind(now)
        .bind(&task.id)
        .execute(&mut *tx)
        .await?;
    } else if new_status == TaskStatus::Archived {
        // Archiving force-stops the timer
        if task.is_timer_active {
            if let Some(started_at) = task.timer_started_at {
                let elapsed = (now - started_at).num_seconds().max(0);
                close_open_entry(tx, &task.id, now, elapsed).await?;
            }
        }

        sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, is_timer_active = 0, timer_started_at = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(new_status)
        .bind(now)
        .bind(&task.id)
        .execute(&mut *tx)
        .await?;
    } else {
        sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
            .bind(new_status)
            .bind(now)
            .bind(&task.id)
            .execute(&mut *tx)
            .await?;
    }

    append_history(tx, &task.id, Some(task.status), new_status, note, actor, now).await
}

async fn append_history(
    tx: &mut SqliteConnection,
    task_id: &str,
    from_status: Option<TaskStatus>,
    to_status: TaskStatus,
    note: Option<String>,
    actor: &str,
    now: DateTime<Utc>,
) -> StorageResult<()> {
    sqlx::query(
        r#"
        INSERT INTO task_status_history (id, task_id, from_status, to_status, note, changed_by, changed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(prefixed_id("hist"))
    .bind(task_id)
    .bind(from_status)
    .bind(to_status)
    .bind(note)
    .bind(actor)
    .bind(now)
    .execute(tx)
    .await?;

    Ok(())
}

/// Force-close every running timer of the owner: flags cleared and open
/// entries closed with their duration, but nothing added to any task's
/// accumulated total. The partial unique index on running timers means
/// this touches at most one task.
async fn force_close_timers(
    tx: &mut SqliteConnection,
    owner: &str,
    now: DateTime<Utc>,
) -> StorageResult<()> {
    let rows = sqlx::query(
        "SELECT id, timer_started_at FROM tasks WHERE created_by = ? AND is_timer_active = 1",
    )
    .bind(owner)
    .fetch_all(&mut *tx)
    .await?;

    for row in &rows {
        let task_id: String = row.try_get("id")?;
        let started_at: Option<DateTime<Utc>> = row.try_get("timer_started_at")?;
        let elapsed = started_at.map_or(0, |s| (now - s).num_seconds().max(0));

        close_open_entry(tx, &task_id, now, elapsed).await?;

        sqlx::query(
            "UPDATE tasks SET is_timer_active = 0, timer_started_at = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(&task_id)
        .execute(&mut *tx)
        .await?;
    }

    Ok(())
}

async fn close_open_entry(
    tx: &mut SqliteConnection,
    task_id: &str,
    now: DateTime<Utc>,
    elapsed: i64,
) -> StorageResult<()> {
    sqlx::query(
        "UPDATE time_entries SET ended_at = ?, duration_seconds = ? WHERE task_id = ? AND ended_at IS NULL",
    )
    .bind(now)
    .bind(elapsed)
    .bind(task_id)
    .execute(tx)
    .await?;

    Ok(())
}

/// Link the task to each tag the owner actually has; foreign ids are ignored
async fn replace_tag_links(
    tx: &mut SqliteConnection,
    owner: &str,
    task_id: &str,
    tag_ids: &[String],
) -> StorageResult<()> {
    for tag_id in tag_ids {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO task_tags (task_id, tag_id)
            SELECT ?, id FROM tags WHERE id = ? AND created_by = ?
            "#,
        )
        .bind(task_id)
        .bind(tag_id)
        .bind(owner)
        .execute(&mut *tx)
        .await?;
    }

    Ok(())
}

/// Convert a database row to a Task; tags are loaded by the caller
fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Task> {
    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        kind: row.try_get("kind")?,
        status: row.try_get("status")?,
        priority: row.try_get("priority")?,
        due_at: row.try_get("due_at")?,
        is_recurring: row.try_get("is_recurring")?,
        recurrence: row
            .try_get::<Option<String>, _>("recurrence")?
            .and_then(|s| serde_json::from_str(&s).ok()),
        is_timer_active: row.try_get("is_timer_active")?,
        timer_started_at: row.try_get("timer_started_at")?,
        total_time_seconds: row.try_get("total_time_seconds")?,
        completed_at: row.try_get("completed_at")?,
        completed_count: row.try_get("completed_count")?,
        parent_task_id: row.try_get("parent_task_id")?,
        project_id: row.try_get("project_id")?,
        tags: Vec::new(),
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_time_entry(row: &sqlx::sqlite::SqliteRow) -> StorageResult<TimeEntry> {
    Ok(TimeEntry {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        started_at: row.try_get("started_at")?,
        ended_at: row.try_get("ended_at")?,
        duration_seconds: row.try_get("duration_seconds")?,
        description: row.try_get("description")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_history(row: &sqlx::sqlite::SqliteRow) -> StorageResult<StatusHistoryEntry> {
    Ok(StatusHistoryEntry {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        from_status: row.try_get("from_status")?,
        to_status: row.try_get("to_status")?,
        note: row.try_get("note")?,
        changed_by: row.try_get("changed_by")?,
        changed_at: row.try_get("changed_at")?,
    })
}
