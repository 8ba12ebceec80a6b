// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global application error enum.
/// Centralizes the domain error taxonomy and its mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 400 Bad Request: format/shape validation failure on user-supplied data
    InvalidInput(String),

    // 401 Unauthorized: bad login or bad/revoked token
    InvalidCredentials(String),

    // 403 Forbidden: role check failed
    Forbidden(String),

    // 404 Not Found: empty query result / no row affected
    DataNotFound(String),

    // 409 Conflict: uniqueness constraint violated
    DuplicateEntry(String),

    // 422 Unprocessable: fewer questions available than a quiz requires
    InsufficientQuestions(String),

    // 500 Internal Server Error
    Internal(String),
}

impl AppError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AppError::InvalidCredentials(_) => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::DataNotFound(_) => (StatusCode::NOT_FOUND, "DATA_NOT_FOUND"),
            AppError::DuplicateEntry(_) => (StatusCode::CONFLICT, "DUPLICATE_ENTRY"),
            AppError::InsufficientQuestions(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_QUESTIONS")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR"),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a structured `{code, status, message}` JSON response.
/// Internal errors are logged with full detail and surfaced with a generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, label) = self.status();

        let message = match self {
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::InvalidInput(msg)
            | AppError::InvalidCredentials(msg)
            | AppError::Forbidden(msg)
            | AppError::DataNotFound(msg)
            | AppError::DuplicateEntry(msg)
            | AppError::InsufficientQuestions(msg) => msg,
        };

        let body = Json(json!({
            "code": status.as_u16(),
            "status": label,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into the matching domain kind.
/// Allows using the `?` operator on database writes and lookups.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::DataNotFound("Record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::DuplicateEntry("Entry already exists".to_string())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// True when the error is a uniqueness-constraint violation, used where a
/// call site wants to attach its own conflict message.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
