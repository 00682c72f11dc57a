//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across the HTTP handlers and
//! the auth gate, along with the mapping to HTTP status codes and the JSON
//! error body shape (`{"error": "..."}`).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Auth { code: String, message: String },
    Storage { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn storage<S: Into<String>>(code: S, msg: S) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// The uniform rejection used by the auth gate. Every gate failure maps to
    /// this value so the response gives no oracle for the failure cause.
    pub fn permission_denied() -> Self {
        AppError::Auth { code: "permission_denied".into(), message: "permission denied".into() }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::UserInput { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Auth { .. } => StatusCode::UNAUTHORIZED,
            AppError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal".into(), message: err.to_string() }
    }
}

impl From<crate::storage::StoreError> for AppError {
    fn from(err: crate::storage::StoreError) -> Self {
        match err {
            crate::storage::StoreError::NotFound => AppError::not_found("not_found", "record not found"),
            other => AppError::Storage { code: "storage".into(), message: other.to_string() },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Error detail beyond the message stays in the logs, never the body.
        let body = serde_json::json!({ "error": self.message() });
        (self.http_status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::auth("auth", "no").http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::storage("storage", "db").http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::internal("internal", "panic").http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn permission_denied_is_401_with_generic_message() {
        let e = AppError::permission_denied();
        assert_eq!(e.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(e.message(), "permission denied");
    }
}
