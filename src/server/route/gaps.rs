use crate::server::error::ApiResult;
use crate::server::types::ApiResponse;
use crate::server::AppState;
use crate::types::{JobConfig, JobId};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use tracing::instrument;

pub fn gap_router(state: AppState) -> Router {
    Router::new()
        .route("/fill", post(handle_gap_fill))
        .route("/find", post(handle_gap_find))
        .with_state(state)
}

/// Submit a gap-fill job. Returns the assigned job id immediately;
/// execution is asynchronous.
#[instrument(skip_all, fields(storage = %config.storage))]
async fn handle_gap_fill(
    State(state): State<AppState>,
    Json(config): Json<JobConfig>,
) -> ApiResult {
    let id: JobId = state.manager.submit_fill(config)?;
    Ok(Json(ApiResponse::success_with_data(id, Some(format!("created gap fill job {id}"))))
        .into_response())
}

/// Submit a gap-find job. Reports missing epoch ranges without writing
/// derived records.
#[instrument(skip_all, fields(storage = %config.storage))]
async fn handle_gap_find(
    State(state): State<AppState>,
    Json(config): Json<JobConfig>,
) -> ApiResult {
    let id: JobId = state.manager.submit_find(config)?;
    Ok(Json(ApiResponse::success_with_data(id, Some(format!("created gap find job {id}"))))
        .into_response())
}
