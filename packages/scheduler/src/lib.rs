// ABOUTME: In-process daily scheduler for journal auto-generation
// ABOUTME: Minute-tick loop matching each user's configured local run time

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Timelike, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time;
use tracing::{error, info, warn};

use daybook_journals::{GenerateOutcome, GenerateParams, GenerateTrigger, JournalGenerator};
use daybook_settings::SettingsStorage;
use daybook_storage::{StorageError, StorageResult};

/// The one registered scheduler job
pub const JOURNAL_JOB_ID: &str = "journal-generation";

const TICK_SECONDS: u64 = 30;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub id: String,
    pub description: String,
    pub scheduled_users: usize,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub tick_seconds: u64,
    pub jobs: Vec<JobStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRunSummary {
    pub job_id: String,
    pub users_run: usize,
    pub outcomes: Vec<GenerateOutcome>,
}

#[derive(Default)]
struct SchedulerState {
    last_run_at: Option<DateTime<Utc>>,
    last_outcome: Option<String>,
    last_minute: Option<NaiveTime>,
}

/// Fires journal generation at each user's configured local time.
/// One instance runs inside the server process; the loop owns no state
/// beyond its last-run bookkeeping, so a restart just resumes.
#[derive(Clone)]
pub struct JournalScheduler {
    generator: Arc<JournalGenerator>,
    settings: Arc<SettingsStorage>,
    state: Arc<RwLock<SchedulerState>>,
    running: Arc<RwLock<bool>>,
}

impl JournalScheduler {
    pub fn new(generator: Arc<JournalGenerator>, settings: Arc<SettingsStorage>) -> Self {
        Self {
            generator,
            settings,
            state: Arc::new(RwLock::new(SchedulerState::default())),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Start the background tick loop (idempotent)
    pub async fn start(&self) {
        let mut running = self.running.write().await;
        if *running {
            return;
        }
        *running = true;
        drop(running);

        let scheduler = self.clone();

        tokio::spawn(async move {
            info!("Journal scheduler started");

            let mut interval = time::interval(Duration::from_secs(TICK_SECONDS));
            loop {
                interval.tick().await;

                if !*scheduler.running.read().await {
                    info!("Journal scheduler stopped");
                    break;
                }

                let minute = current_minute();
                let already_ran = scheduler.state.read().await.last_minute == Some(minute);
                if already_ran {
                    continue;
                }
                scheduler.state.write().await.last_minute = Some(minute);

                if let Err(e) = scheduler.run_due(minute).await {
                    error!("Scheduler tick failed: {}", e);
                }
            }
        });
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    /// Run generation for every user whose configured time matches `minute`.
    /// Returns how many users ran.
    pub async fn run_due(&self, minute: NaiveTime) -> StorageResult<usize> {
        let scheduled = self.settings.list_scheduled_users().await?;

        let mut ran = 0;
        for (user_id, schedule_time) in scheduled {
            match parse_schedule(&schedule_time) {
                Some(at) if at == minute => {
                    let outcome = self.run_for_user(&user_id, None).await?;
                    info!(
                        "Scheduled journal generation for {}: {}",
                        user_id, outcome.message
                    );
                    ran += 1;
                }
                Some(_) => {}
                None => {
                    warn!(
                        "User {} has an unparseable schedule time: {}",
                        user_id, schedule_time
                    );
                }
            }
        }

        if ran > 0 {
            let mut state = self.state.write().await;
            state.last_run_at = Some(Utc::now());
            state.last_outcome = Some(format!("generated journals for {} users", ran));
        }

        Ok(ran)
    }

    /// Manual trigger: run the scheduled generation for one user right now
    pub async fn run_for_user(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> StorageResult<GenerateOutcome> {
        self.generator
            .generate(
                user_id,
                GenerateParams {
                    date,
                    force: false,
                    template_name: None,
                    respect_settings: true,
                    trigger: GenerateTrigger::Schedule,
                },
            )
            .await
    }

    /// Run a registered job by id, for every scheduled user, ignoring the
    /// clock. Unknown ids are NotFound.
    pub async fn execute_job(&self, job_id: &str) -> StorageResult<JobRunSummary> {
        if job_id != JOURNAL_JOB_ID {
            return Err(StorageError::NotFound);
        }

        let scheduled = self.settings.list_scheduled_users().await?;
        let mut outcomes = Vec::with_capacity(scheduled.len());
        for (user_id, _) in &scheduled {
            outcomes.push(self.run_for_user(user_id, None).await?);
        }

        let mut state = self.state.write().await;
        state.last_run_at = Some(Utc::now());
        state.last_outcome = Some(format!("manual run for {} users", outcomes.len()));

        Ok(JobRunSummary {
            job_id: job_id.to_string(),
            users_run: outcomes.len(),
            outcomes,
        })
    }

    pub async fn status(&self) -> StorageResult<SchedulerStatus> {
        let scheduled_users = self.settings.list_scheduled_users().await?.len();
        let state = self.state.read().await;

        Ok(SchedulerStatus {
            running: *self.running.read().await,
            tick_seconds: TICK_SECONDS,
            jobs: vec![JobStatus {
                id: JOURNAL_JOB_ID.to_string(),
                description: "Daily journal generation from completed tasks".to_string(),
                scheduled_users,
                last_run_at: state.last_run_at,
                last_outcome: state.last_outcome.clone(),
            }],
        })
    }
}

/// The local wall clock, truncated to the minute
fn current_minute() -> NaiveTime {
    let now = Local::now().time();
    NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).expect("truncated time is valid")
}

/// Parse a user-configured "HH:MM" schedule time
fn parse_schedule(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}
