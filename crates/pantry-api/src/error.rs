use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use pantry_db::StoreError;

/// Request-level failures. Everything a handler can return funnels through
/// here so every error body has the same `{"detail": ...}` shape.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid credentials")]
    InvalidCredential,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// A blocking-task join failure is a bug, not a client error.
    pub fn task(e: tokio::task::JoinError) -> Self {
        error!("Blocking task failed: {e}");
        Self::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthenticated | ApiError::InvalidCredential => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(e) => match e {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                StoreError::InsufficientStock | StoreError::Conflict(_) => StatusCode::CONFLICT,
                StoreError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Storage failures keep their cause in the log, not in the response.
        let detail = match &self {
            ApiError::Store(StoreError::Persistence(cause)) => {
                error!("Storage failure: {cause}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
