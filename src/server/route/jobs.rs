use crate::server::error::ApiResult;
use crate::server::types::ApiResponse;
use crate::server::AppState;
use crate::types::{JobId, JobSummary};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::instrument;

pub fn job_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_list_jobs))
        .route("/:id/start", post(handle_start_job))
        .route("/:id/stop", post(handle_stop_job))
        .with_state(state)
}

/// Resume a stopped job.
#[instrument(skip(state), fields(job_id = id))]
async fn handle_start_job(Path(id): Path<i64>, State(state): State<AppState>) -> ApiResult {
    state.manager.start(JobId(id))?;
    Ok(Json(ApiResponse::<()>::success(Some(format!("job {id} started")))).into_response())
}

/// Request cooperative cancellation; takes effect at the next transaction
/// boundary.
#[instrument(skip(state), fields(job_id = id))]
async fn handle_stop_job(Path(id): Path<i64>, State(state): State<AppState>) -> ApiResult {
    state.manager.stop(JobId(id))?;
    Ok(Json(ApiResponse::<()>::success(Some(format!("job {id} stop requested")))).into_response())
}

/// Snapshot of all known jobs, ascending by id.
#[instrument(skip(state))]
async fn handle_list_jobs(State(state): State<AppState>) -> ApiResult {
    let jobs: Vec<JobSummary> = state.manager.list();
    Ok(Json(ApiResponse::success_with_data(jobs, None)).into_response())
}
