use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Crate-wide error type. Validation, duplicate and not-found errors carry
/// user-facing messages; everything else answers with a generic body and
/// logs the details.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("short code is already taken")]
    DuplicateCode,
    #[error("could not allocate an unused short code")]
    ShortCodeExhausted,
    #[error("secure randomness unavailable")]
    EntropyUnavailable(#[from] rand::Error),
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("storage call timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("statistics aggregation failed: {0}")]
    Aggregation(#[source] sqlx::Error),
    #[error("mail delivery failed: {0}")]
    Mail(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateCode => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status.is_server_error() {
            tracing::error!("{self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, body).into_response()
    }
}
