// ABOUTME: Integration tests for settings storage
// ABOUTME: Tests default merging, persistence, and scheduled-user listing

use daybook_settings::{Role, SettingsStorage, UserSettings};

const OWNER: &str = "user-1";

#[tokio::test]
async fn test_get_or_default_without_row() {
    let pool = daybook_storage::connect_memory().await.unwrap();
    let storage = SettingsStorage::new(pool);

    assert!(storage.find(OWNER).await.unwrap().is_none());

    let settings = storage.get_or_default(OWNER).await.unwrap();
    assert_eq!(settings.role, Role::User);
    assert!(settings.journal.auto_generation_enabled);
    assert_eq!(settings.journal.schedule_time, "23:55");
}

#[tokio::test]
async fn test_save_and_read_back() {
    let pool = daybook_storage::connect_memory().await.unwrap();
    let storage = SettingsStorage::new(pool);

    let mut settings = UserSettings::default();
    settings.journal.generate_on_task_completion = true;
    settings.ui.theme = "dark".to_string();

    storage.save(OWNER, &settings).await.unwrap();

    let back = storage.get_or_default(OWNER).await.unwrap();
    assert!(back.journal.generate_on_task_completion);
    assert_eq!(back.ui.theme, "dark");

    // Saving again overwrites in place: still a single row
    settings.ui.theme = "light".to_string();
    storage.save(OWNER, &settings).await.unwrap();
    let back = storage.get_or_default(OWNER).await.unwrap();
    assert_eq!(back.ui.theme, "light");
}

#[tokio::test]
async fn test_old_partial_blob_reads_with_defaults() {
    let pool = daybook_storage::connect_memory().await.unwrap();
    let storage = SettingsStorage::new(pool.clone());

    // A blob written before notification prefs existed
    sqlx::query("INSERT INTO user_settings (user_id, settings, updated_at) VALUES (?, ?, ?)")
        .bind(OWNER)
        .bind(r#"{"role":"admin","journal":{"includeTags":true}}"#)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .unwrap();

    let settings = storage.get_or_default(OWNER).await.unwrap();
    assert_eq!(settings.role, Role::Admin);
    assert!(settings.journal.include_tags);
    assert!(settings.notifications.due_reminders); // default filled in
}

#[tokio::test]
async fn test_is_admin() {
    let pool = daybook_storage::connect_memory().await.unwrap();
    let storage = SettingsStorage::new(pool);

    assert!(!storage.is_admin(OWNER).await.unwrap());

    let mut settings = UserSettings::default();
    settings.role = Role::Admin;
    storage.save(OWNER, &settings).await.unwrap();

    assert!(storage.is_admin(OWNER).await.unwrap());
}

#[tokio::test]
async fn test_list_scheduled_users() {
    let pool = daybook_storage::connect_memory().await.unwrap();
    let storage = SettingsStorage::new(pool);

    let mut on = UserSettings::default();
    on.journal.daily_schedule_enabled = true;
    on.journal.schedule_time = "06:30".to_string();
    storage.save("user-on", &on).await.unwrap();

    let mut off = UserSettings::default();
    off.journal.daily_schedule_enabled = false;
    storage.save("user-off", &off).await.unwrap();

    // Schedule enabled but generation disabled entirely: not scheduled
    let mut disabled = UserSettings::default();
    disabled.journal.daily_schedule_enabled = true;
    disabled.journal.auto_generation_enabled = false;
    storage.save("user-disabled", &disabled).await.unwrap();

    let scheduled = storage.list_scheduled_users().await.unwrap();
    assert_eq!(scheduled, vec![("user-on".to_string(), "06:30".to_string())]);
}
