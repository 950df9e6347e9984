// ABOUTME: Journal storage layer using SQLite
// ABOUTME: Date-keyed upsert, search, timeline, template stats, writing habits

use chrono::{Datelike, Duration, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use daybook_core::{prefixed_id, today_local, BatchOutcome};
use daybook_storage::{conflict_on_unique, StorageError, StorageResult};

use crate::types::{
    Journal, JournalCreateInput, JournalStats, JournalUpdateInput, JournalUpsertInput,
    TemplateCount, TimelineDay, WritingHabits,
};

pub struct JournalStorage {
    pool: SqlitePool,
}

impl JournalStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List the owner's journals, most recent day first, keyset-paginated
    /// on (entry_date, id)
    pub async fn list_journals(
        &self,
        owner: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        limit: i64,
        cursor: Option<(NaiveDate, String)>,
    ) -> StorageResult<Vec<Journal>> {
        debug!("Fetching journals for owner: {} (limit: {})", owner, limit);

        let mut query = String::from("SELECT * FROM journals WHERE created_by = ?");
        if from.is_some() {
            query.push_str(" AND entry_date >= ?");
        }
        if to.is_some() {
            query.push_str(" AND entry_date <= ?");
        }
        if cursor.is_some() {
            query.push_str(" AND (entry_date < ? OR (entry_date = ? AND id < ?))");
        }
        query.push_str(" ORDER BY entry_date DESC, id DESC LIMIT ?");

        let mut q = sqlx::query(&query).bind(owner);
        if let Some(from) = &from {
            q = q.bind(from);
        }
        if let Some(to) = &to {
            q = q.bind(to);
        }
        if let Some((entry_date, id)) = &cursor {
            q = q.bind(entry_date).bind(entry_date).bind(id);
        }
        q = q.bind(limit);

        let rows = q.fetch_all(&self.pool).await?;

        rows.iter().map(row_to_journal).collect()
    }

    pub async fn get_journal(&self, owner: &str, journal_id: &str) -> StorageResult<Journal> {
        debug!("Fetching journal: {}", journal_id);

        let row = sqlx::query("SELECT * FROM journals WHERE id = ? AND created_by = ?")
            .bind(journal_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)?;

        row_to_journal(&row)
    }

    /// The entry for a calendar day, if any
    pub async fn find_by_date(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> StorageResult<Option<Journal>> {
        let row = sqlx::query("SELECT * FROM journals WHERE created_by = ? AND entry_date = ?")
            .bind(owner)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(row_to_journal(&r)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_date(&self, owner: &str, date: NaiveDate) -> StorageResult<Journal> {
        self.find_by_date(owner, date)
            .await?
            .ok_or(StorageError::NotFound)
    }

    /// Strict create: one entry per day, a second is a conflict
    pub async fn create_journal(
        &self,
        owner: &str,
        input: JournalCreateInput,
    ) -> StorageResult<Journal> {
        let journal_id = prefixed_id("jrnl");
        let entry_date = input.entry_date.unwrap_or_else(today_local);
        let now = Utc::now();

        debug!("Creating journal: {} for {}", journal_id, entry_date);

        sqlx::query(
            r#"
            INSERT INTO journals (id, entry_date, content, template_name, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&journal_id)
        .bind(entry_date)
        .bind(input.content.as_deref().unwrap_or(""))
        .bind(&input.template_name)
        .bind(owner)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(e, format!("A journal for {} already exists", entry_date))
        })?;

        self.get_journal(owner, &journal_id).await
    }

    pub async fn update_journal(
        &self,
        owner: &str,
        journal_id: &str,
        input: JournalUpdateInput,
    ) -> StorageResult<Journal> {
        debug!("Updating journal: {}", journal_id);

        let mut query_parts = vec!["updated_at = ?"];
        if input.content.is_some() {
            query_parts.push("content = ?");
        }
        if input.template_name.is_some() {
            query_parts.push("template_name = ?");
        }

        let query_str = format!(
            "UPDATE journals SET {} WHERE id = ? AND created_by = ?",
            query_parts.join(", ")
        );

        let now = Utc::now();
        let mut query = sqlx::query(&query_str).bind(now);
        if let Some(content) = &input.content {
            query = query.bind(content);
        }
        if let Some(template_name) = &input.template_name {
            query = query.bind(template_name);
        }

        let result = query.bind(journal_id).bind(owner).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_journal(owner, journal_id).await
    }

    pub async fn delete_journal(&self, owner: &str, journal_id: &str) -> StorageResult<()> {
        debug!("Deleting journal: {}", journal_id);

        let result = sqlx::query("DELETE FROM journals WHERE id = ? AND created_by = ?")
            .bind(journal_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    /// Create or wholesale-replace the entry for a day. The uniqueness
    /// constraint on (created_by, entry_date) makes this race-safe.
    pub async fn upsert(&self, owner: &str, input: JournalUpsertInput) -> StorageResult<Journal> {
        let entry_date = input.entry_date.unwrap_or_else(today_local);
        let now = Utc::now();

        debug!("Upserting journal for {} ({})", entry_date, owner);

        sqlx::query(
            r#"
            INSERT INTO journals (id, entry_date, content, template_name, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (created_by, entry_date) DO UPDATE SET
                content = excluded.content,
                template_name = excluded.template_name,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(prefixed_id("jrnl"))
        .bind(entry_date)
        .bind(&input.content)
        .bind(&input.template_name)
        .bind(owner)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_date(owner, entry_date).await
    }

    /// Case-insensitive substring search over content
    pub async fn search(&self, owner: &str, text: &str, limit: i64) -> StorageResult<Vec<Journal>> {
        debug!("Searching journals for owner: {}", owner);

        let pattern = format!("%{}%", text);
        let rows = sqlx::query(
            r#"
            SELECT * FROM journals
            WHERE created_by = ? AND content LIKE ?
            ORDER BY entry_date DESC
            LIMIT ?
            "#,
        )
        .bind(owner)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_journal).collect()
    }

    pub async fn get_stats(&self, owner: &str) -> StorageResult<JournalStats> {
        debug!("Computing journal stats for owner: {}", owner);

        let total_entries: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM journals WHERE created_by = ?")
                .bind(owner)
                .fetch_one(&self.pool)
                .await?;

        let today = today_local();
        let month_start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
            .expect("the first of the month exists");
        let entries_this_month: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM journals WHERE created_by = ? AND entry_date >= ?",
        )
        .bind(owner)
        .bind(month_start)
        .fetch_one(&self.pool)
        .await?;

        let average_length_chars: i64 = sqlx::query_scalar(
            "SELECT CAST(COALESCE(AVG(LENGTH(content)), 0) AS INTEGER) FROM journals WHERE created_by = ?",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        let most_used_template: Option<String> = sqlx::query_scalar(
            r#"
            SELECT template_name FROM journals
            WHERE created_by = ? AND template_name IS NOT NULL
            GROUP BY template_name
            ORDER BY COUNT(*) DESC
            LIMIT 1
            "#,
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(JournalStats {
            total_entries,
            entries_this_month,
            average_length_chars,
            most_used_template,
        })
    }

    /// Days with an entry in a month, or in a whole year when month is None
    pub async fn get_timeline(
        &self,
        owner: &str,
        year: i32,
        month: Option<u32>,
    ) -> StorageResult<Vec<TimelineDay>> {
        let (from, to) = match month {
            Some(month) => {
                let from = NaiveDate::from_ymd_opt(year, month, 1)
                    .ok_or_else(|| StorageError::InvalidState(format!("Invalid month: {}", month)))?;
                let to = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                }
                .expect("the first of the month exists");
                (from, to)
            }
            None => {
                let from = NaiveDate::from_ymd_opt(year, 1, 1)
                    .ok_or_else(|| StorageError::InvalidState(format!("Invalid year: {}", year)))?;
                let to = NaiveDate::from_ymd_opt(year + 1, 1, 1)
                    .expect("January the first exists");
                (from, to)
            }
        };

        let rows = sqlx::query(
            r#"
            SELECT id, entry_date, LENGTH(content) as content_length
            FROM journals
            WHERE created_by = ? AND entry_date >= ? AND entry_date < ?
            ORDER BY entry_date
            "#,
        )
        .bind(owner)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut days = Vec::new();
        for row in &rows {
            days.push(TimelineDay {
                entry_date: row.try_get("entry_date")?,
                journal_id: row.try_get("id")?,
                content_length: row.try_get("content_length")?,
            });
        }
        Ok(days)
    }

    pub async fn get_template_stats(&self, owner: &str) -> StorageResult<Vec<TemplateCount>> {
        let rows = sqlx::query(
            r#"
            SELECT template_name, COUNT(*) as count
            FROM journals
            WHERE created_by = ?
            GROUP BY template_name
            ORDER BY count DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = Vec::new();
        for row in &rows {
            counts.push(TemplateCount {
                template_name: row.try_get("template_name")?,
                count: row.try_get("count")?,
            });
        }
        Ok(counts)
    }

    /// Streaks and volume over the trailing `days`-day window
    pub async fn get_writing_habits(&self, owner: &str, days: i64) -> StorageResult<WritingHabits> {
        let days = days.max(1);
        let today = today_local();
        let from = today - Duration::days(days - 1);

        let rows = sqlx::query(
            r#"
            SELECT entry_date, LENGTH(content) as content_length
            FROM journals
            WHERE created_by = ? AND entry_date >= ? AND entry_date <= ?
            ORDER BY entry_date DESC
            "#,
        )
        .bind(owner)
        .bind(from)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        let mut dates: Vec<NaiveDate> = Vec::new();
        let mut total_length: i64 = 0;
        for row in &rows {
            dates.push(row.try_get("entry_date")?);
            total_length += row.try_get::<i64, _>("content_length")?;
        }

        let entries_in_window = dates.len() as i64;
        let average_length_chars = if entries_in_window > 0 {
            total_length / entries_in_window
        } else {
            0
        };

        // Current streak: consecutive days counting back from today; a
        // streak that ended yesterday still counts until today is written.
        let mut current_streak = 0i64;
        let mut expected = today;
        for date in &dates {
            if *date == expected {
                current_streak += 1;
                expected = expected - Duration::days(1);
            } else if current_streak == 0 && *date == today - Duration::days(1) {
                current_streak = 1;
                expected = *date - Duration::days(1);
            } else {
                break;
            }
        }

        // Longest streak anywhere in the window (dates are descending)
        let mut longest_streak = 0i64;
        let mut run = 0i64;
        let mut previous: Option<NaiveDate> = None;
        for date in &dates {
            run = match previous {
                Some(prev) if prev - *date == Duration::days(1) => run + 1,
                _ => 1,
            };
            longest_streak = longest_streak.max(run);
            previous = Some(*date);
        }

        Ok(WritingHabits {
            days_window: days,
            entries_in_window,
            current_streak,
            longest_streak,
            average_length_chars,
        })
    }

    /// Delete many journals; missing ids are skipped
    pub async fn batch_delete(&self, owner: &str, ids: &[String]) -> StorageResult<BatchOutcome> {
        let mut affected = 0;

        for id in ids {
            match self.delete_journal(owner, id).await {
                Ok(()) => affected += 1,
                Err(StorageError::NotFound) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(BatchOutcome {
            requested: ids.len(),
            affected,
        })
    }
}

fn row_to_journal(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Journal> {
    Ok(Journal {
        id: row.try_get("id")?,
        entry_date: row.try_get("entry_date")?,
        content: row.try_get("content")?,
        template_name: row.try_get("template_name")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
