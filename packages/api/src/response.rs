// ABOUTME: Shared API response types and error handling
// ABOUTME: Consistent response envelope and StorageError-to-HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use serde::Serialize;
use tracing::error;

use daybook_storage::{StorageError, StorageResult};

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// 200 with the payload, or the mapped storage error
pub fn ok_or_error<T: Serialize>(result: StorageResult<T>, context: &str) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, ResponseJson(ApiResponse::success(data))).into_response(),
        Err(e) => error_response(e, context),
    }
}

/// 201 with the payload, or the mapped storage error
pub fn created_or_error<T: Serialize>(result: StorageResult<T>, context: &str) -> Response {
    match result {
        Ok(data) => (
            StatusCode::CREATED,
            ResponseJson(ApiResponse::success(data)),
        )
            .into_response(),
        Err(e) => error_response(e, context),
    }
}

/// Map a storage error onto HTTP. Domain errors carry their message;
/// everything unexpected is logged and flattened to an opaque 500.
pub fn error_response(err: StorageError, context: &str) -> Response {
    let (status, message) = match &err {
        StorageError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        StorageError::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
        StorageError::InvalidState(message) => (StatusCode::BAD_REQUEST, message.clone()),
        _ => {
            error!("{}: {}", context, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };

    (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
}

pub fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        ResponseJson(ApiResponse::<()>::error("Admin access required".to_string())),
    )
        .into_response()
}
