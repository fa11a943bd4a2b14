//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Request errors
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    // Fixture errors
    #[error("Injected failure: {0}")]
    Injected(String),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Injected(msg) => {
                tracing::warn!("Injected failure: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Fixture(msg) => {
                tracing::error!("Fixture error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Same body shape the prediction API uses for every error
        let body = Json(json!({
            "detail": self.to_string(),
        }));

        (status, body).into_response()
    }
}
