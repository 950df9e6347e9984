// ABOUTME: Integration tests for project storage operations
// ABOUTME: Tests CRUD, name conflicts, delete guard, archiving, batch operations

use chrono::Utc;
use sqlx::SqlitePool;

use daybook_projects::{ProjectBatchOp, ProjectCreateInput, ProjectStorage, ProjectUpdateInput};
use daybook_storage::StorageError;

const OWNER: &str = "user-1";

async fn create_test_db() -> SqlitePool {
    daybook_storage::connect_memory().await.unwrap()
}

fn input(name: &str) -> ProjectCreateInput {
    ProjectCreateInput {
        name: name.to_string(),
        description: None,
        color: None,
    }
}

async fn insert_task(pool: &SqlitePool, id: &str, project_id: &str, status: &str, time: i64) {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO tasks (id, title, status, project_id, total_time_seconds, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind("Task")
    .bind(status)
    .bind(project_id)
    .bind(time)
    .bind(OWNER)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn test_create_and_get_project() {
    let pool = create_test_db().await;
    let storage = ProjectStorage::new(pool);

    let project = storage
        .create_project(
            OWNER,
            ProjectCreateInput {
                name: "Spring cleaning".to_string(),
                description: Some("Declutter the flat".to_string()),
                color: Some("#33aa77".to_string()),
            },
        )
        .await
        .unwrap();

    assert!(project.id.starts_with("proj-"));
    assert!(!project.is_archived);

    let fetched = storage.get_project(OWNER, &project.id).await.unwrap();
    assert_eq!(fetched.name, "Spring cleaning");

    let foreign = storage.get_project("user-2", &project.id).await;
    assert!(matches!(foreign, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn test_active_name_conflict() {
    let pool = create_test_db().await;
    let storage = ProjectStorage::new(pool);

    let first = storage.create_project(OWNER, input("Website")).await.unwrap();

    let dup = storage.create_project(OWNER, input("Website")).await;
    assert!(matches!(dup, Err(StorageError::Conflict(_))));

    // Archiving frees the name for reuse
    storage.archive_project(OWNER, &first.id).await.unwrap();
    storage.create_project(OWNER, input("Website")).await.unwrap();
}

#[tokio::test]
async fn test_update_project() {
    let pool = create_test_db().await;
    let storage = ProjectStorage::new(pool);

    let project = storage.create_project(OWNER, input("Draft")).await.unwrap();

    let updated = storage
        .update_project(
            OWNER,
            &project.id,
            ProjectUpdateInput {
                name: Some("Final".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Final");
    assert!(updated.updated_at >= project.updated_at);
}

#[tokio::test]
async fn test_delete_empty_project_succeeds() {
    let pool = create_test_db().await;
    let storage = ProjectStorage::new(pool);

    let project = storage.create_project(OWNER, input("Empty")).await.unwrap();
    storage.delete_project(OWNER, &project.id).await.unwrap();

    let gone = storage.get_project(OWNER, &project.id).await;
    assert!(matches!(gone, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn test_delete_non_empty_project_fails_naming_counts() {
    let pool = create_test_db().await;
    let storage = ProjectStorage::new(pool.clone());

    let project = storage.create_project(OWNER, input("Busy")).await.unwrap();
    insert_task(&pool, "task-1", &project.id, "todo", 0).await;

    let result = storage.delete_project(OWNER, &project.id).await;
    let message = match result {
        Err(StorageError::InvalidState(m)) => m,
        other => panic!("expected InvalidState, got {:?}", other),
    };
    assert!(message.contains("1 tasks"));
    assert!(message.contains("0 notes"));

    assert!(storage.get_project(OWNER, &project.id).await.is_ok());
}

#[tokio::test]
async fn test_list_projects_excludes_archived_by_default() {
    let pool = create_test_db().await;
    let storage = ProjectStorage::new(pool);

    let keep = storage.create_project(OWNER, input("Keep")).await.unwrap();
    let archive = storage.create_project(OWNER, input("Old")).await.unwrap();
    storage.archive_project(OWNER, &archive.id).await.unwrap();

    let active = storage.list_projects(OWNER, false, 50, None).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, keep.id);

    let all = storage.list_projects(OWNER, true, 50, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_batch_operation_skips_guarded_rows() {
    let pool = create_test_db().await;
    let storage = ProjectStorage::new(pool.clone());

    let empty = storage.create_project(OWNER, input("Empty")).await.unwrap();
    let busy = storage.create_project(OWNER, input("Busy")).await.unwrap();
    insert_task(&pool, "task-1", &busy.id, "todo", 0).await;

    let ids = vec![empty.id.clone(), busy.id.clone(), "proj-missing".to_string()];
    let outcome = storage
        .batch_operation(OWNER, &ids, ProjectBatchOp::Delete)
        .await
        .unwrap();

    assert_eq!(outcome.requested, 3);
    assert_eq!(outcome.affected, 1);
    assert!(storage.get_project(OWNER, &busy.id).await.is_ok());
}

#[tokio::test]
async fn test_project_stats() {
    let pool = create_test_db().await;
    let storage = ProjectStorage::new(pool.clone());

    let project = storage.create_project(OWNER, input("Stats")).await.unwrap();
    insert_task(&pool, "task-1", &project.id, "done", 120).await;
    insert_task(&pool, "task-2", &project.id, "todo", 60).await;
    insert_task(&pool, "task-3", &project.id, "todo", 0).await;

    let stats = storage.get_stats(OWNER, &project.id).await.unwrap();
    assert_eq!(stats.total_tasks, 3);
    assert_eq!(stats.completed_tasks, 1);
    assert_eq!(stats.total_time_seconds, 180);
    assert_eq!(stats.total_notes, 0);

    let todo = stats.status_counts.iter().find(|c| c.status == "todo").unwrap();
    assert_eq!(todo.count, 2);
}
