// ABOUTME: Journal auto-generation service
// ABOUTME: Renders the day's completed tasks into a markdown entry, upserted by date

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use daybook_core::{local_day_bounds, today_local};
use daybook_projects::ProjectStorage;
use daybook_settings::SettingsStorage;
use daybook_storage::StorageResult;
use daybook_tags::TagStorage;
use daybook_tasks::{Task, TaskStorage};

use crate::storage::JournalStorage;
use crate::types::{GenerateOutcome, GenerateParams, GenerateTrigger, JournalUpsertInput};

/// One rendered bullet of the generated entry
#[derive(Debug, Clone)]
struct CompletedLine {
    title: String,
    time_spent: Option<String>,
    project: Option<String>,
    tags: Vec<String>,
}

pub struct JournalGenerator {
    tasks: Arc<TaskStorage>,
    journals: Arc<JournalStorage>,
    projects: Arc<ProjectStorage>,
    tags: Arc<TagStorage>,
    settings: Arc<SettingsStorage>,
}

impl JournalGenerator {
    pub fn new(
        tasks: Arc<TaskStorage>,
        journals: Arc<JournalStorage>,
        projects: Arc<ProjectStorage>,
        tags: Arc<TagStorage>,
        settings: Arc<SettingsStorage>,
    ) -> Self {
        Self {
            tasks,
            journals,
            projects,
            tags,
            settings,
        }
    }

    /// Collect the day's completed tasks and create or refresh the day's
    /// journal entry. Policy skips come back as `success: false` outcomes.
    pub async fn generate(
        &self,
        owner: &str,
        params: GenerateParams,
    ) -> StorageResult<GenerateOutcome> {
        let date = params.date.unwrap_or_else(today_local);
        let (start, end) = local_day_bounds(date);

        debug!(
            "Journal generation for {} on {} (trigger: {:?})",
            owner, date, params.trigger
        );

        let prefs = self.settings.get_or_default(owner).await?.journal;

        if params.respect_settings {
            if !prefs.auto_generation_enabled {
                return Ok(GenerateOutcome::skipped(
                    "Auto journal generation is disabled in settings",
                ));
            }
            match params.trigger {
                GenerateTrigger::TaskCompletion if !prefs.generate_on_task_completion => {
                    return Ok(GenerateOutcome::skipped(
                        "Generation on task completion is disabled in settings",
                    ));
                }
                GenerateTrigger::Schedule if !prefs.daily_schedule_enabled => {
                    return Ok(GenerateOutcome::skipped(
                        "The daily journal schedule is disabled in settings",
                    ));
                }
                _ => {}
            }
        }

        // A manually written entry (no template name) is only overwritten on force
        if let Some(existing) = self.journals.find_by_date(owner, date).await? {
            if existing.template_name.is_none() && !params.force {
                return Ok(GenerateOutcome::skipped(format!(
                    "The journal for {} was written manually; pass force to overwrite it",
                    date
                )));
            }
        }

        let completed = self.tasks.list_completed_in_range(owner, start, end).await?;

        let mut lines = Vec::with_capacity(completed.len());
        let mut project_names: HashMap<String, String> = HashMap::new();
        let mut tag_names: HashMap<String, String> = HashMap::new();

        for task in &completed {
            lines.push(self.annotate(owner, task, &prefs, &mut project_names, &mut tag_names).await?);
        }

        let template_name = params
            .template_name
            .unwrap_or_else(|| prefs.template_name.clone());
        let content = render_journal(date, &lines);

        let journal = self
            .journals
            .upsert(
                owner,
                JournalUpsertInput {
                    entry_date: Some(date),
                    content,
                    template_name: Some(template_name),
                },
            )
            .await?;

        info!(
            "Generated journal {} for {} from {} completed tasks",
            journal.id,
            date,
            completed.len()
        );

        Ok(GenerateOutcome {
            success: true,
            message: format!(
                "Generated journal for {} from {} completed tasks",
                date,
                completed.len()
            ),
            journal_id: Some(journal.id),
            tasks_count: completed.len(),
        })
    }

    async fn annotate(
        &self,
        owner: &str,
        task: &Task,
        prefs: &daybook_settings::JournalPrefs,
        project_names: &mut HashMap<String, String>,
        tag_names: &mut HashMap<String, String>,
    ) -> StorageResult<CompletedLine> {
        let time_spent = if prefs.include_time_spent && task.total_time_seconds > 0 {
            Some(format_duration(task.total_time_seconds))
        } else {
            None
        };

        let project = match (&task.project_id, prefs.include_project) {
            (Some(project_id), true) => {
                if !project_names.contains_key(project_id) {
                    let name = self.projects.get_project(owner, project_id).await?.name;
                    project_names.insert(project_id.clone(), name);
                }
                project_names.get(project_id).cloned()
            }
            _ => None,
        };

        let mut tags = Vec::new();
        if prefs.include_tags {
            for tag_id in &task.tags {
                if !tag_names.contains_key(tag_id) {
                    let name = self.tags.get_tag(owner, tag_id).await?.name;
                    tag_names.insert(tag_id.clone(), name);
                }
                if let Some(name) = tag_names.get(tag_id) {
                    tags.push(name.clone());
                }
            }
        }

        Ok(CompletedLine {
            title: task.title.clone(),
            time_spent,
            project,
            tags,
        })
    }
}

/// The fixed template: heading, completed-task bullets, placeholder when empty
fn render_journal(date: NaiveDate, lines: &[CompletedLine]) -> String {
    let mut out = format!("# Journal for {}\n\n", date);
    out.push_str(&format!("## Completed tasks ({})\n\n", lines.len()));

    if lines.is_empty() {
        out.push_str("No tasks were completed on this day.\n");
        return out;
    }

    for line in lines {
        out.push_str(&format!("- {}", line.title));
        if let Some(time) = &line.time_spent {
            out.push_str(&format!(" ({})", time));
        }
        if let Some(project) = &line.project {
            out.push_str(&format!(" [{}]", project));
        }
        for tag in &line.tags {
            out.push_str(&format!(" #{}", tag));
        }
        out.push('\n');
    }

    out
}

fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(title: &str) -> CompletedLine {
        CompletedLine {
            title: title.to_string(),
            time_spent: None,
            project: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_render_empty_day() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let body = render_journal(date, &[]);

        assert!(body.starts_with("# Journal for 2024-06-15"));
        assert!(body.contains("## Completed tasks (0)"));
        assert!(body.contains("No tasks were completed on this day."));
    }

    #[test]
    fn test_render_annotated_lines() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let lines = vec![
            CompletedLine {
                title: "Write report".to_string(),
                time_spent: Some("1h 30m".to_string()),
                project: Some("Website".to_string()),
                tags: vec!["deep-work".to_string()],
            },
            line("Water plants"),
        ];
        let body = render_journal(date, &lines);

        assert!(body.contains("## Completed tasks (2)"));
        assert!(body.contains("- Write report (1h 30m) [Website] #deep-work\n"));
        assert!(body.contains("- Water plants\n"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(180), "3m");
        assert_eq!(format_duration(5400), "1h 30m");
    }
}
