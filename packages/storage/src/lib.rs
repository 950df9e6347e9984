// ABOUTME: Database connection management and shared storage error taxonomy
// ABOUTME: SQLite pool setup with WAL/foreign-key pragmas and compiled-in migrations

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Schema migrations compiled into the binary
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidState(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Map a unique-constraint violation to a Conflict with a user-facing
/// message, passing every other database error through unchanged.
pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::Conflict(message.into())
        }
        _ => StorageError::Sqlx(err),
    }
}

/// Open (creating if missing) the database at the given path, or the
/// default `~/.daybook/daybook.db`, and run pending migrations.
pub async fn connect(database_path: Option<PathBuf>) -> StorageResult<SqlitePool> {
    let database_path =
        database_path.unwrap_or_else(|| daybook_core::daybook_dir().join("daybook.db"));

    // Ensure parent directory exists
    if let Some(parent) = database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    debug!("Connecting to database: {}", database_path.display());

    let options = SqliteConnectOptions::new()
        .filename(&database_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect_with(options)
        .await?;

    info!("Database connection established");

    MIGRATOR.run(&pool).await?;

    debug!("Database migrations completed");

    Ok(pool)
}

/// In-memory database with the full schema, for tests.
///
/// Capped at a single connection: every pooled connection to
/// `sqlite::memory:` would otherwise get its own empty database.
pub async fn connect_memory() -> StorageResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}
