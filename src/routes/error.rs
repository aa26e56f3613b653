//! HTTP error mapping for every handler in the gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::LoginError;
use crate::error::EngineError;
use crate::session::SessionError;
use crate::store::StoreError;

// ---

/// Error type for HTTP handlers, rendered as `{ "error", "code" }`.
#[derive(Debug, Error)]
pub enum ApiError {
    // ---
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Login(#[from] LoginError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("session {0} not found")]
    UnknownSession(Uuid),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let (status, code) = match &self {
            ApiError::Session(SessionError::Engine(EngineError::Validation(_))) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Session(SessionError::Engine(EngineError::NotFound { .. })) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ApiError::Session(SessionError::AlertNotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ApiError::Session(SessionError::NotMonitoring) => {
                (StatusCode::CONFLICT, "NOT_MONITORING")
            }
            ApiError::Session(SessionError::Store(StoreError::Invalid(_)))
            | ApiError::Store(StoreError::Invalid(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Session(SessionError::Store(_)) | ApiError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR")
            }
            ApiError::Login(LoginError::InvalidCredentials { .. }) => {
                (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
            }
            ApiError::Login(LoginError::LockedOut { .. }) => (StatusCode::LOCKED, "LOCKED_OUT"),
            ApiError::UnknownSession(_) => (StatusCode::NOT_FOUND, "UNKNOWN_SESSION"),
            ApiError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = json!({
            "error": self.to_string(),
            "code": code,
        });
        (status, Json(body)).into_response()
    }
}
