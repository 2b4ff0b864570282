use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use domain::{DomainError, FieldErrors};
use infrastructure::RepositoryError;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::throttle::retry_after_secs;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found")]
    NotFound,

    #[error("Request was throttled")]
    Throttled { wait: Option<Duration> },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// スロットル時のメッセージ（待ち時間は切り上げ秒）
pub fn throttled_message(wait: Option<Duration>) -> String {
    match wait.map(retry_after_secs) {
        Some(1) => "Request was throttled. Expected available in 1 second.".to_string(),
        Some(secs) => format!("Request was throttled. Expected available in {secs} seconds."),
        None => "Request was throttled.".to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(fields) => {
                let body = json!({
                    "error": "Validation failed",
                    "code": "VALIDATION_ERROR",
                    "fields": fields,
                });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "No Todo matches the given query.".to_string(),
            ),
            ApiError::Throttled { wait } => (
                StatusCode::TOO_MANY_REQUESTS,
                "THROTTLED",
                throttled_message(*wait),
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({ "error": message, "code": code });
        let mut response = (status, Json(body)).into_response();

        if let ApiError::Throttled { wait: Some(wait) } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(wait)),
            );
        }

        response
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(fields) => ApiError::Validation(fields),
            // 形式不正な識別子は一致するレコードが無いものとして扱う
            DomainError::InvalidTodoId(_) => ApiError::NotFound,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}
