//! HTTP route handlers.

pub mod doctor;

use axum::Router;
use axum::http::Uri;
use serde::Serialize;

use crate::error::AppError;
use crate::query::{PageMeta, PagedResult};
use crate::state::AppState;

/// Response envelope shared by every successful endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T> ApiResponse<Vec<T>> {
    /// Envelope for one page of a listing.
    pub fn paged(message: impl Into<String>, result: PagedResult<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(result.data),
            meta: Some(result.meta),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(doctor::router())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Route {uri} not found"))
}
