use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::domain::upload::UploadError;
use crate::domain::validate::SolveInputError;

/// Errors surfaced by the HTTP handlers, rendered as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Input(#[from] SolveInputError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("failed to read request body: {0}")]
    Payload(String),

    #[error("run {0} not found")]
    RunNotFound(u64),

    #[error("benchmark worker failed: {0}")]
    Worker(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Input(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload(UploadError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upload(UploadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::Payload(_) => StatusCode::BAD_REQUEST,
            ApiError::RunNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": self.to_string() }))
    }
}
