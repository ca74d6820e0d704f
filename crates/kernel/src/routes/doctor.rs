//! Doctor listing routes.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use crate::error::AppResult;
use crate::models::doctor::list_doctors;
use crate::query::QueryParams;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Create the doctor router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/doctors", get(list))
}

/// `GET /api/v1/doctors`: search, filter, sort and page through doctors.
async fn list(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    let result = list_doctors(state.doctors(), &params).await?;
    Ok(Json(ApiResponse::paged(
        "Doctors retrieved successfully",
        result,
    )))
}
