//! Application error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    NotFound(String),
}

/// One entry of `errorSources` in an error body.
#[derive(Debug, Serialize)]
pub struct ErrorSource {
    pub path: String,
    pub message: String,
}

/// JSON body for every failed request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_sources: Vec<ErrorSource>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        // Internal details are logged, never returned
        let error_sources = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "internal server error");
                vec![ErrorSource {
                    path: String::new(),
                    message: self.to_string(),
                }]
            }
            AppError::NotFound(_) => Vec::new(),
        };

        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            error_sources,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
