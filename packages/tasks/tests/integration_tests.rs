// ABOUTME: Integration tests for the task lifecycle
// ABOUTME: Status machine, history rows, timer accounting, recurrence, stats

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use daybook_storage::StorageError;
use daybook_tasks::{
    RecurrencePattern, TaskCreateInput, TaskFilter, TaskKind, TaskPriority, TaskStatus,
    TaskStorage, TaskUpdateInput,
};

const OWNER: &str = "user-1";

async fn create_test_db() -> SqlitePool {
    daybook_storage::connect_memory().await.unwrap()
}

fn input(title: &str) -> TaskCreateInput {
    TaskCreateInput {
        title: title.to_string(),
        description: None,
        kind: None,
        status: None,
        priority: None,
        due_at: None,
        project_id: None,
        tags: None,
    }
}

/// Pretend the running timer started `seconds` ago
async fn backdate_timer(pool: &SqlitePool, task_id: &str, seconds: i64) {
    let started = Utc::now() - Duration::seconds(seconds);
    sqlx::query("UPDATE tasks SET timer_started_at = ? WHERE id = ?")
        .bind(started)
        .bind(task_id)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_task_writes_creation_history() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Write report")).await.unwrap();

    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.completed_count, 0);

    let history = storage.get_status_history(OWNER, &task.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_status, None);
    assert_eq!(history[0].to_status, TaskStatus::Todo);
}

#[tokio::test]
async fn test_idea_kind_defaults_to_idea_status() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage
        .create_task(
            OWNER,
            TaskCreateInput {
                kind: Some(TaskKind::Idea),
                ..input("Someday maybe")
            },
        )
        .await
        .unwrap();

    assert_eq!(task.status, TaskStatus::Idea);
}

#[tokio::test]
async fn test_done_transition_side_effects() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Finish it")).await.unwrap();
    let done = storage
        .update_status(OWNER, &task.id, TaskStatus::Done, Some("shipped".to_string()))
        .await
        .unwrap();

    assert!(done.completed_at.is_some());
    assert_eq!(done.completed_count, 1);
    assert!(!done.is_timer_active);

    let history = storage.get_status_history(OWNER, &task.id).await.unwrap();
    assert_eq!(history.len(), 2);
    let last = history.last().unwrap();
    assert_eq!(last.to_status, TaskStatus::Done);
    assert_eq!(last.note, Some("shipped".to_string()));
    assert!(last.changed_at >= history[0].changed_at);
}

#[tokio::test]
async fn test_leaving_done_clears_completed_at() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Flip flop")).await.unwrap();
    storage
        .update_status(OWNER, &task.id, TaskStatus::Done, None)
        .await
        .unwrap();
    let back = storage
        .update_status(OWNER, &task.id, TaskStatus::Waiting, None)
        .await
        .unwrap();

    assert!(back.completed_at.is_none());
    assert_eq!(back.completed_count, 1); // counter never decreases
}

#[tokio::test]
async fn test_same_status_is_a_no_op() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Idle")).await.unwrap();
    let unchanged = storage
        .update_status(OWNER, &task.id, TaskStatus::Todo, None)
        .await
        .unwrap();

    assert_eq!(unchanged.status, TaskStatus::Todo);

    let history = storage.get_status_history(OWNER, &task.id).await.unwrap();
    assert_eq!(history.len(), 1); // creation row only
}

#[tokio::test]
async fn test_restart_requires_terminal_status() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Not done yet")).await.unwrap();

    let result = storage.restart_task(OWNER, &task.id, None).await;
    assert!(matches!(result, Err(StorageError::InvalidState(_))));

    // Task is unchanged
    let unchanged = storage.get_task(OWNER, &task.id).await.unwrap();
    assert_eq!(unchanged.status, TaskStatus::Todo);

    // A done task restarts, defaulting to TODO, clearing completion
    storage
        .update_status(OWNER, &task.id, TaskStatus::Done, None)
        .await
        .unwrap();
    let restarted = storage.restart_task(OWNER, &task.id, None).await.unwrap();
    assert_eq!(restarted.status, TaskStatus::Todo);
    assert!(restarted.completed_at.is_none());
}

#[tokio::test]
async fn test_archive_rejects_archived_task() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Old news")).await.unwrap();
    let archived = storage.archive_task(OWNER, &task.id).await.unwrap();
    assert_eq!(archived.status, TaskStatus::Archived);

    let again = storage.archive_task(OWNER, &task.id).await;
    assert!(matches!(again, Err(StorageError::InvalidState(_))));
}

#[tokio::test]
async fn test_start_timer_force_closes_other_timer() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let a = storage.create_task(OWNER, input("Task A")).await.unwrap();
    let b = storage.create_task(OWNER, input("Task B")).await.unwrap();

    storage.start_timer(OWNER, &b.id).await.unwrap();
    storage.start_timer(OWNER, &a.id).await.unwrap();

    let a = storage.get_task(OWNER, &a.id).await.unwrap();
    let b = storage.get_task(OWNER, &b.id).await.unwrap();
    assert!(a.is_timer_active);
    assert!(!b.is_timer_active);

    // B's entry was closed, but nothing was added to its total
    let entries = storage.get_time_entries(OWNER, &b.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].ended_at.is_some());
    assert_eq!(b.total_time_seconds, 0);
}

#[tokio::test]
async fn test_start_timer_guards() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Busy")).await.unwrap();
    storage.start_timer(OWNER, &task.id).await.unwrap();

    let double = storage.start_timer(OWNER, &task.id).await;
    assert!(matches!(double, Err(StorageError::InvalidState(_))));

    let done = storage.create_task(OWNER, input("Done already")).await.unwrap();
    storage
        .update_status(OWNER, &done.id, TaskStatus::Done, None)
        .await
        .unwrap();
    let on_done = storage.start_timer(OWNER, &done.id).await;
    assert!(matches!(on_done, Err(StorageError::InvalidState(_))));
}

#[tokio::test]
async fn test_pause_without_timer_fails() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Still")).await.unwrap();
    let result = storage.pause_timer(OWNER, &task.id).await;
    assert!(matches!(result, Err(StorageError::InvalidState(_))));
}

#[tokio::test]
async fn test_pause_accumulates_across_sessions() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool.clone());

    let task = storage.create_task(OWNER, input("Two sessions")).await.unwrap();

    storage.start_timer(OWNER, &task.id).await.unwrap();
    backdate_timer(&pool, &task.id, 90).await;
    let after_first = storage.pause_timer(OWNER, &task.id).await.unwrap();
    assert!(after_first.total_time_seconds >= 90);
    assert!(!after_first.is_timer_active);

    storage.start_timer(OWNER, &task.id).await.unwrap();
    backdate_timer(&pool, &task.id, 30).await;
    let after_second = storage.pause_timer(OWNER, &task.id).await.unwrap();
    assert!(after_second.total_time_seconds >= 120);

    // Two closed entries whose durations sum to the accumulated total
    let entries = storage.get_time_entries(OWNER, &task.id).await.unwrap();
    assert_eq!(entries.len(), 2);
    let summed: i64 = entries.iter().filter_map(|e| e.duration_seconds).sum();
    assert_eq!(summed, after_second.total_time_seconds);
}

#[tokio::test]
async fn test_idea_start_stop_scenario() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool.clone());

    let task = storage
        .create_task(
            OWNER,
            TaskCreateInput {
                kind: Some(TaskKind::Idea),
                ..input("Spark")
            },
        )
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Idea);

    let started = storage.start_timer(OWNER, &task.id).await.unwrap();
    assert_eq!(started.status, TaskStatus::InProgress);
    assert!(started.is_timer_active);

    backdate_timer(&pool, &task.id, 60).await;
    let stopped = storage.stop_timer(OWNER, &task.id).await.unwrap();
    assert_eq!(stopped.status, TaskStatus::Done);
    assert!(stopped.total_time_seconds > 0);
    assert!(stopped.completed_at.is_some());

    // Creation, timer promotion, completion: the promotion is logged too
    let history = storage.get_status_history(OWNER, &task.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].to_status, TaskStatus::Idea);
    assert_eq!(history[1].from_status, Some(TaskStatus::Idea));
    assert_eq!(history[1].to_status, TaskStatus::InProgress);
    assert_eq!(history[2].to_status, TaskStatus::Done);
}

#[tokio::test]
async fn test_done_while_timer_running_skips_pause_accounting() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool.clone());

    let task = storage.create_task(OWNER, input("Abandon timer")).await.unwrap();
    storage.start_timer(OWNER, &task.id).await.unwrap();
    backdate_timer(&pool, &task.id, 45).await;

    let done = storage
        .update_status(OWNER, &task.id, TaskStatus::Done, None)
        .await
        .unwrap();

    assert!(!done.is_timer_active);
    assert!(done.timer_started_at.is_none());
    // Force-stop closes the entry but does not add to the total
    assert_eq!(done.total_time_seconds, 0);

    let entries = storage.get_time_entries(OWNER, &task.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].ended_at.is_some());
    assert!(entries[0].duration_seconds.unwrap() >= 45);
}

#[tokio::test]
async fn test_set_recurring_and_generate_next_instance() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let plain = storage.create_task(OWNER, input("One-off")).await.unwrap();
    let not_recurring = storage.generate_next_instance(OWNER, &plain.id).await;
    assert!(matches!(not_recurring, Err(StorageError::InvalidState(_))));

    let task = storage
        .create_task(
            OWNER,
            TaskCreateInput {
                priority: Some(TaskPriority::High),
                description: Some("Water the plants".to_string()),
                ..input("Weekly chore")
            },
        )
        .await
        .unwrap();

    let zero = storage
        .set_recurring(
            OWNER,
            &task.id,
            Some(RecurrencePattern::Weekly {
                interval: 0,
                time: None,
            }),
        )
        .await;
    assert!(matches!(zero, Err(StorageError::InvalidState(_))));

    let recurring = storage
        .set_recurring(
            OWNER,
            &task.id,
            Some(RecurrencePattern::Weekly {
                interval: 1,
                time: None,
            }),
        )
        .await
        .unwrap();
    assert!(recurring.is_recurring);

    let next = storage.generate_next_instance(OWNER, &task.id).await.unwrap();
    assert_eq!(next.title, "Weekly chore");
    assert_eq!(next.description, Some("Water the plants".to_string()));
    assert_eq!(next.priority, Some(TaskPriority::High));
    assert_eq!(next.parent_task_id, Some(task.id.clone()));
    assert_eq!(next.status, TaskStatus::Todo);

    let due = next.due_at.unwrap();
    let week_out = Utc::now() + Duration::weeks(1);
    assert!((due - week_out).num_seconds().abs() < 60);

    let history = storage.get_status_history(OWNER, &next.id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_list_tasks_filters_and_pagination() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    for i in 0..5 {
        storage
            .create_task(OWNER, input(&format!("Task {}", i)))
            .await
            .unwrap();
    }
    let urgent = storage
        .create_task(
            OWNER,
            TaskCreateInput {
                priority: Some(TaskPriority::Urgent),
                ..input("Fire drill")
            },
        )
        .await
        .unwrap();

    let filter = TaskFilter {
        priority: Some(TaskPriority::Urgent),
        ..Default::default()
    };
    let urgent_only = storage.list_tasks(OWNER, &filter, 50, None).await.unwrap();
    assert_eq!(urgent_only.len(), 1);
    assert_eq!(urgent_only[0].id, urgent.id);

    let search = TaskFilter {
        search: Some("fire".to_string()),
        ..Default::default()
    };
    let found = storage.list_tasks(OWNER, &search, 50, None).await.unwrap();
    assert_eq!(found.len(), 1);

    // Keyset pagination walks the full set without overlap
    let all = TaskFilter::default();
    let page1 = storage.list_tasks(OWNER, &all, 4, None).await.unwrap();
    assert_eq!(page1.len(), 4);
    let last = page1.last().unwrap();
    let page2 = storage
        .list_tasks(OWNER, &all, 4, Some((last.created_at, last.id.clone())))
        .await
        .unwrap();
    assert_eq!(page2.len(), 2);
    let mut seen: Vec<_> = page1.iter().chain(page2.iter()).map(|t| &t.id).collect();
    seen.dedup();
    assert_eq!(seen.len(), 6);
}

#[tokio::test]
async fn test_update_task_does_not_touch_status() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Rename me")).await.unwrap();
    let updated = storage
        .update_task(
            OWNER,
            &task.id,
            TaskUpdateInput {
                title: Some("Renamed".to_string()),
                priority: Some(TaskPriority::Low),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.status, TaskStatus::Todo);

    let history = storage.get_status_history(OWNER, &task.id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_owner_scoping() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Mine")).await.unwrap();

    let foreign_get = storage.get_task("user-2", &task.id).await;
    assert!(matches!(foreign_get, Err(StorageError::NotFound)));

    let foreign_delete = storage.delete_task("user-2", &task.id).await;
    assert!(matches!(foreign_delete, Err(StorageError::NotFound)));

    let foreign_status = storage
        .update_status("user-2", &task.id, TaskStatus::Done, None)
        .await;
    assert!(matches!(foreign_status, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn test_stats() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    for i in 0..4 {
        storage
            .create_task(OWNER, input(&format!("Task {}", i)))
            .await
            .unwrap();
    }
    let tasks = storage
        .list_tasks(OWNER, &TaskFilter::default(), 50, None)
        .await
        .unwrap();
    storage
        .update_status(OWNER, &tasks[0].id, TaskStatus::Done, None)
        .await
        .unwrap();

    let stats = storage.get_stats(OWNER, None, None).await.unwrap();
    assert_eq!(stats.total_tasks, 4);
    assert_eq!(stats.completed_tasks, 1);
    assert!((stats.completion_rate - 0.25).abs() < f64::EPSILON);

    let done = stats
        .status_counts
        .iter()
        .find(|c| c.status == TaskStatus::Done)
        .unwrap();
    assert_eq!(done.count, 1);
}

#[tokio::test]
async fn test_completed_in_range() {
    let pool = create_test_db().await;
    let storage = TaskStorage::new(pool);

    let task = storage.create_task(OWNER, input("Today's win")).await.unwrap();
    storage
        .update_status(OWNER, &task.id, TaskStatus::Done, None)
        .await
        .unwrap();
    storage.create_task(OWNER, input("Unfinished")).await.unwrap();

    let now = Utc::now();
    let completed = storage
        .list_completed_in_range(OWNER, now - Duration::hours(1), now + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, task.id);

    let yesterday = storage
        .list_completed_in_range(
            OWNER,
            now - Duration::hours(48),
            now - Duration::hours(24),
        )
        .await
        .unwrap();
    assert!(yesterday.is_empty());
}
