// ABOUTME: Integration tests for note storage operations
// ABOUTME: Tests CRUD, task links, search, stats, and batch operations

use chrono::Utc;
use sqlx::SqlitePool;

use daybook_notes::{NoteBatchOp, NoteCreateInput, NoteStorage, NoteUpdateInput};
use daybook_storage::StorageError;

const OWNER: &str = "user-1";

async fn create_test_db() -> SqlitePool {
    daybook_storage::connect_memory().await.unwrap()
}

fn input(title: &str) -> NoteCreateInput {
    NoteCreateInput {
        title: title.to_string(),
        content: None,
        summary: None,
        project_id: None,
        tags: None,
    }
}

async fn insert_task(pool: &SqlitePool, id: &str, owner: &str) {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO tasks (id, title, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind("Task")
    .bind(owner)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn test_create_and_get_note() {
    let pool = create_test_db().await;
    let storage = NoteStorage::new(pool);

    let note = storage
        .create_note(
            OWNER,
            NoteCreateInput {
                content: Some("# Meeting notes\n\n- decided things".to_string()),
                summary: Some("Weekly sync".to_string()),
                ..input("Sync 2024-06-03")
            },
        )
        .await
        .unwrap();

    assert!(note.id.starts_with("note-"));
    assert!(!note.is_pinned);
    assert!(note.content.contains("Meeting notes"));

    let foreign = storage.get_note("user-2", &note.id).await;
    assert!(matches!(foreign, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn test_update_and_pin_note() {
    let pool = create_test_db().await;
    let storage = NoteStorage::new(pool);

    let note = storage.create_note(OWNER, input("Draft")).await.unwrap();

    let updated = storage
        .update_note(
            OWNER,
            &note.id,
            NoteUpdateInput {
                is_pinned: Some(true),
                content: Some("Revised".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(updated.is_pinned);
    assert_eq!(updated.content, "Revised");
    assert_eq!(updated.title, "Draft"); // untouched
}

#[tokio::test]
async fn test_link_and_unlink_task() {
    let pool = create_test_db().await;
    let storage = NoteStorage::new(pool.clone());

    insert_task(&pool, "task-1", OWNER).await;
    let note = storage.create_note(OWNER, input("Research")).await.unwrap();

    let linked = storage.link_task(OWNER, &note.id, "task-1").await.unwrap();
    assert_eq!(linked.linked_tasks, vec!["task-1".to_string()]);

    // Linking again is a conflict
    let again = storage.link_task(OWNER, &note.id, "task-1").await;
    assert!(matches!(again, Err(StorageError::Conflict(_))));

    let unlinked = storage.unlink_task(OWNER, &note.id, "task-1").await.unwrap();
    assert!(unlinked.linked_tasks.is_empty());

    // Unlinking a task that is not linked is NotFound
    let missing = storage.unlink_task(OWNER, &note.id, "task-1").await;
    assert!(matches!(missing, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn test_link_requires_owned_task() {
    let pool = create_test_db().await;
    let storage = NoteStorage::new(pool.clone());

    insert_task(&pool, "task-theirs", "user-2").await;
    let note = storage.create_note(OWNER, input("Mine")).await.unwrap();

    let result = storage.link_task(OWNER, &note.id, "task-theirs").await;
    assert!(matches!(result, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn test_search_skips_archived() {
    let pool = create_test_db().await;
    let storage = NoteStorage::new(pool);

    let hit = storage
        .create_note(
            OWNER,
            NoteCreateInput {
                content: Some("the gardening calendar".to_string()),
                ..input("Garden")
            },
        )
        .await
        .unwrap();
    let archived = storage
        .create_note(
            OWNER,
            NoteCreateInput {
                content: Some("old gardening plans".to_string()),
                ..input("Garden history")
            },
        )
        .await
        .unwrap();
    storage.archive_note(OWNER, &archived.id).await.unwrap();

    let found = storage.search(OWNER, "gardening", 50).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, hit.id);
}

#[tokio::test]
async fn test_list_notes_project_filter() {
    let pool = create_test_db().await;
    let storage = NoteStorage::new(pool.clone());

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO projects (id, name, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind("proj-1")
    .bind("Home")
    .bind(OWNER)
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();

    storage
        .create_note(
            OWNER,
            NoteCreateInput {
                project_id: Some("proj-1".to_string()),
                ..input("In project")
            },
        )
        .await
        .unwrap();
    storage.create_note(OWNER, input("Loose")).await.unwrap();

    let in_project = storage
        .list_notes(OWNER, false, Some("proj-1"), 50, None)
        .await
        .unwrap();
    assert_eq!(in_project.len(), 1);
    assert_eq!(in_project[0].title, "In project");

    let all = storage.list_notes(OWNER, false, None, 50, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_batch_move_and_delete() {
    let pool = create_test_db().await;
    let storage = NoteStorage::new(pool.clone());

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO projects (id, name, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind("proj-1")
    .bind("Target")
    .bind(OWNER)
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();

    let a = storage.create_note(OWNER, input("A")).await.unwrap();
    let b = storage.create_note(OWNER, input("B")).await.unwrap();

    let ids = vec![a.id.clone(), b.id.clone(), "note-missing".to_string()];
    let moved = storage
        .batch_operation(OWNER, &ids, NoteBatchOp::Move(Some("proj-1".to_string())))
        .await
        .unwrap();
    assert_eq!(moved.requested, 3);
    assert_eq!(moved.affected, 2);

    let a = storage.get_note(OWNER, &a.id).await.unwrap();
    assert_eq!(a.project_id, Some("proj-1".to_string()));

    let deleted = storage
        .batch_operation(OWNER, &ids, NoteBatchOp::Delete)
        .await
        .unwrap();
    assert_eq!(deleted.affected, 2);
    assert!(storage.get_note(OWNER, &b.id).await.is_err());
}

#[tokio::test]
async fn test_batch_move_to_foreign_project_fails() {
    let pool = create_test_db().await;
    let storage = NoteStorage::new(pool.clone());

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO projects (id, name, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind("proj-theirs")
    .bind("Theirs")
    .bind("user-2")
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();

    let note = storage.create_note(OWNER, input("Homeless")).await.unwrap();
    let result = storage
        .batch_operation(
            OWNER,
            &[note.id.clone()],
            NoteBatchOp::Move(Some("proj-theirs".to_string())),
        )
        .await;
    assert!(matches!(result, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn test_stats() {
    let pool = create_test_db().await;
    let storage = NoteStorage::new(pool.clone());

    insert_task(&pool, "task-1", OWNER).await;

    let pinned = storage.create_note(OWNER, input("Pinned")).await.unwrap();
    storage
        .update_note(
            OWNER,
            &pinned.id,
            NoteUpdateInput {
                is_pinned: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let linked = storage.create_note(OWNER, input("Linked")).await.unwrap();
    storage.link_task(OWNER, &linked.id, "task-1").await.unwrap();

    let archived = storage.create_note(OWNER, input("Archived")).await.unwrap();
    storage.archive_note(OWNER, &archived.id).await.unwrap();

    let stats = storage.get_stats(OWNER).await.unwrap();
    assert_eq!(stats.total_notes, 3);
    assert_eq!(stats.pinned_notes, 1);
    assert_eq!(stats.archived_notes, 1);
    assert_eq!(stats.notes_with_links, 1);
}
