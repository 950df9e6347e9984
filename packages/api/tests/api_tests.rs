// ABOUTME: Integration tests for the HTTP API
// ABOUTME: Auth extractor, response envelope, pagination shape, admin gating

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use daybook_api::{create_router, AppState};
use daybook_settings::{Role, SettingsStorage, UserSettings};

const USER: &str = "user-1";

async fn app() -> (Router, AppState) {
    let pool = daybook_storage::connect_memory().await.unwrap();
    let state = AppState::new(pool);
    (create_router(state.clone()), state)
}

fn request(method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let (app, _) = app().await;

    let response = app
        .oneshot(request(Method::GET, "/api/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let (app, _) = app().await;

    let response = app
        .oneshot(request(Method::GET, "/api/tasks", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_task_create_and_list_envelope() {
    let (app, _) = app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/tasks",
            Some(USER),
            Some(json!({ "title": "Buy stamps" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["title"], json!("Buy stamps"));
    assert_eq!(body["data"]["status"], json!("todo"));

    let response = app
        .oneshot(request(Method::GET, "/api/tasks?limit=10", Some(USER), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["nextCursor"], Value::Null);
}

#[tokio::test]
async fn test_list_pagination_returns_cursor() {
    let (app, _) = app().await;

    for i in 0..3 {
        app.clone()
            .oneshot(request(
                Method::POST,
                "/api/tasks",
                Some(USER),
                Some(json!({ "title": format!("Task {}", i) })),
            ))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/tasks?limit=2", Some(USER), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    let cursor = body["data"]["nextCursor"].as_str().unwrap().to_string();

    let uri = format!("/api/tasks?limit=2&cursor={}", cursor);
    let response = app
        .oneshot(request(Method::GET, &uri, Some(USER), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["nextCursor"], Value::Null);
}

#[tokio::test]
async fn test_foreign_task_reads_as_not_found() {
    let (app, _) = app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/tasks",
            Some(USER),
            Some(json!({ "title": "Private" })),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/tasks/{}", task_id);
    let response = app
        .oneshot(request(Method::GET, &uri, Some("someone-else"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_status_update_flows_through() {
    let (app, _) = app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/tasks",
            Some(USER),
            Some(json!({ "title": "Finish" })),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/tasks/{}/status", task_id);
    let response = app
        .oneshot(request(
            Method::PUT,
            &uri,
            Some(USER),
            Some(json!({ "status": "done" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], json!("done"));
    assert!(body["data"]["completedAt"].is_string());
}

#[tokio::test]
async fn test_invalid_state_maps_to_bad_request() {
    let (app, _) = app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/tasks",
            Some(USER),
            Some(json!({ "title": "Still todo" })),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    // Restarting a non-terminal task is a precondition failure
    let uri = format!("/api/tasks/{}/restart", task_id);
    let response = app
        .oneshot(request(Method::POST, &uri, Some(USER), Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scheduler_status_requires_admin() {
    let (app, state) = app().await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/scheduler/status", Some(USER), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Promote the user and retry
    let settings_storage = SettingsStorage::new(state.pool.clone());
    let mut settings = UserSettings::default();
    settings.role = Role::Admin;
    settings_storage.save(USER, &settings).await.unwrap();

    let response = app
        .oneshot(request(Method::GET, "/api/scheduler/status", Some(USER), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["jobs"][0]["id"], json!("journal-generation"));
}

#[tokio::test]
async fn test_first_settings_read_seeds_defaults_and_system_tags() {
    let (app, _) = app().await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/settings", Some(USER), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["role"], json!("user"));
    assert_eq!(body["data"]["journal"]["scheduleTime"], json!("23:55"));

    let response = app
        .oneshot(request(Method::GET, "/api/tags", Some(USER), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|t| t["isSystem"] == json!(true)));
}

#[tokio::test]
async fn test_settings_update_cannot_self_promote() {
    let (app, _) = app().await;

    let mut wanted = serde_json::to_value(UserSettings::default()).unwrap();
    wanted["role"] = json!("admin");
    wanted["ui"]["theme"] = json!("dark");

    let response = app
        .clone()
        .oneshot(request(Method::PUT, "/api/settings", Some(USER), Some(wanted)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["role"], json!("user")); // role preserved
    assert_eq!(body["data"]["ui"]["theme"], json!("dark")); // rest applied
}

#[tokio::test]
async fn test_journal_auto_generate_endpoint() {
    let (app, _) = app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/tasks",
            Some(USER),
            Some(json!({ "title": "Morning run" })),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/tasks/{}/status", task_id);
    app.clone()
        .oneshot(request(
            Method::PUT,
            &uri,
            Some(USER),
            Some(json!({ "status": "done" })),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(request(
            Method::POST,
            "/api/journals/auto-generate",
            Some(USER),
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["success"], json!(true));
    assert_eq!(body["data"]["tasksCount"], json!(1));
}
