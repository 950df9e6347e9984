// ABOUTME: Shared application state for API handlers
// ABOUTME: Owns the SQLite pool, the storage layers, the generator, and the scheduler

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;

use daybook_journals::{JournalGenerator, JournalStorage};
use daybook_notes::NoteStorage;
use daybook_projects::ProjectStorage;
use daybook_scheduler::JournalScheduler;
use daybook_settings::SettingsStorage;
use daybook_storage::StorageResult;
use daybook_tags::TagStorage;
use daybook_tasks::TaskStorage;

/// Shared database state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub task_storage: Arc<TaskStorage>,
    pub project_storage: Arc<ProjectStorage>,
    pub note_storage: Arc<NoteStorage>,
    pub journal_storage: Arc<JournalStorage>,
    pub tag_storage: Arc<TagStorage>,
    pub settings_storage: Arc<SettingsStorage>,
    pub journal_generator: Arc<JournalGenerator>,
    pub scheduler: Arc<JournalScheduler>,
}

impl AppState {
    /// Create application state from a SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        let task_storage = Arc::new(TaskStorage::new(pool.clone()));
        let project_storage = Arc::new(ProjectStorage::new(pool.clone()));
        let note_storage = Arc::new(NoteStorage::new(pool.clone()));
        let journal_storage = Arc::new(JournalStorage::new(pool.clone()));
        let tag_storage = Arc::new(TagStorage::new(pool.clone()));
        let settings_storage = Arc::new(SettingsStorage::new(pool.clone()));

        let journal_generator = Arc::new(JournalGenerator::new(
            task_storage.clone(),
            journal_storage.clone(),
            project_storage.clone(),
            tag_storage.clone(),
            settings_storage.clone(),
        ));
        let scheduler = Arc::new(JournalScheduler::new(
            journal_generator.clone(),
            settings_storage.clone(),
        ));

        Self {
            pool,
            task_storage,
            project_storage,
            note_storage,
            journal_storage,
            tag_storage,
            settings_storage,
            journal_generator,
            scheduler,
        }
    }

    /// Open (or create) the database and build the state
    pub async fn init(database_path: Option<PathBuf>) -> StorageResult<Self> {
        let pool = daybook_storage::connect(database_path).await?;
        Ok(Self::new(pool))
    }
}
