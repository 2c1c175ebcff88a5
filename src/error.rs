use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::PathRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid form data: {0}")]
    Multipart(#[from] MultipartError),
    #[error("invalid form request: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("invalid path: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Multipart(err) => err.status(),
            AppError::MultipartRejection(rejection) => rejection.status(),
            AppError::PathRejection(rejection) => rejection.status(),
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!("{}", self);
            "Internal server error".to_string()
        } else {
            tracing::debug!("{}", self);
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
