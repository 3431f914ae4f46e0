use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;

use leakprobe_core::SampleError;

pub(crate) const GENERIC_ERROR: &str = "Internal server error";

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Handler failures. Every variant becomes a 500 with a JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to collect memory stats: {0}")]
    Stats(#[from] SampleError),

    #[error("failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("request task failed: {0}")]
    Task(#[from] JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Error handling request: {self}");
        let body = match &self {
            ApiError::Stats(e) => ErrorBody::new(e.to_string()),
            ApiError::Encode(_) | ApiError::Task(_) => ErrorBody::new(GENERIC_ERROR),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
