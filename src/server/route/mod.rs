pub mod gaps;
pub mod jobs;

use crate::server::error::ApiError;
use crate::server::types::ApiResponse;
use crate::server::AppState;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

/// Assemble the control API router: job lifecycle under `/jobs`, gap
/// submission under `/gaps`, plus an unauthenticated health probe.
pub fn server_router(state: AppState) -> Router {
    Router::new()
        .nest("/jobs", jobs::job_router(state.clone()))
        .nest("/gaps", gaps::gap_router(state.clone()))
        .layer(middleware::from_fn_with_state(state, require_auth))
        .route("/health", get(health))
}

async fn health() -> Response {
    Json(ApiResponse::<()>::success(Some("ok".to_string()))).into_response()
}

/// Bearer-token check. When no token is configured the API is open.
async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = &state.auth_token {
        let presented = request
            .headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainStateReader;
    use crate::extract::{ExtractorRegistry, RewardExtractor};
    use crate::scheduler::gaps::MockGapScanner;
    use crate::scheduler::{ExtractionPolicy, JobContext, JobManager};
    use crate::storage::{Sink, SinkSet};
    use crate::types::GapReport;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use rstest::*;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state(auth_token: Option<String>) -> AppState {
        let mut registry = ExtractorRegistry::new();
        RewardExtractor::register_all(&mut registry);
        let mut sinks = SinkSet::new();
        sinks.insert(Sink::memory("primary").await);

        let mut chain = MockChainStateReader::new();
        chain.expect_head_epoch().returning(|| Ok(5));
        chain.expect_block_headers().returning(|_| Ok(Vec::new()));
        chain.expect_actor().returning(|address, epoch| {
            Ok(crate::types::ActorInfo {
                address: address.to_string(),
                code: crate::extract::reward::REWARD_ACTOR_CODES[0].into(),
                head: "bafyhead".into(),
                epoch,
                parent_state_root: "bafyroot".into(),
            })
        });
        chain.expect_reward_state().returning(|_| {
            Err(crate::error::ChainError::Decode("no fixture state".into()))
        });
        let mut scanner = MockGapScanner::new();
        scanner.expect_scan().returning(|_, _, _, _| {
            Ok(vec![GapReport { task: "reward".into(), from: 1, to: 2 }])
        });

        let manager = JobManager::new(Arc::new(JobContext {
            registry,
            sinks,
            chain: Arc::new(chain),
            scanner: Arc::new(scanner),
            on_extraction_error: ExtractionPolicy::Skip,
        }));
        AppState { manager, auth_token }
    }

    fn fill_request(storage: &str) -> HttpRequest<Body> {
        let body = serde_json::json!({ "storage": storage, "tasks": [] });
        HttpRequest::builder()
            .method("POST")
            .uri("/gaps/fill")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn health_is_reachable_without_a_token() {
        let app = server_router(test_state(Some("sekrit".into())).await);
        let response = app
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[rstest]
    #[tokio::test]
    async fn configured_token_gates_the_job_routes() {
        let state = test_state(Some("sekrit".into())).await;

        let denied = server_router(state.clone())
            .oneshot(HttpRequest::builder().uri("/jobs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = server_router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/jobs")
                    .header(header::AUTHORIZATION, "Bearer sekrit")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[rstest]
    #[tokio::test]
    async fn gap_fill_assigns_an_id_and_the_job_is_listed() {
        let state = test_state(None).await;

        let submitted =
            server_router(state.clone()).oneshot(fill_request("primary")).await.unwrap();
        assert_eq!(submitted.status(), StatusCode::OK);
        let body = response_json(submitted).await;
        assert_eq!(body["success"], true);
        let id = body["data"].as_i64().unwrap();
        assert!(id > 0);

        let listed = server_router(state)
            .oneshot(HttpRequest::builder().uri("/jobs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = response_json(listed).await;
        let jobs = body["data"].as_array().unwrap();
        assert!(jobs.iter().any(|j| j["id"].as_i64() == Some(id)));
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_storage_is_a_bad_request() {
        let state = test_state(None).await;
        let response = server_router(state).oneshot(fill_request("nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[rstest]
    #[tokio::test]
    async fn lifecycle_routes_map_job_errors_to_statuses() {
        let state = test_state(None).await;

        let missing = server_router(state.clone())
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/jobs/999/start")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let id = state.manager.submit_fill(crate::types::JobConfig::for_storage("primary")).unwrap();
        let stopped = server_router(state.clone())
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri(format!("/jobs/{id}/stop"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(stopped.status(), StatusCode::OK);
        let _ = state.manager.wait(id).await;
    }

    #[rstest]
    fn job_errors_map_onto_http_statuses() {
        use crate::error::JobError;
        use crate::types::JobId;

        let conflict = ApiError::from(JobError::InvalidState {
            id: JobId(1),
            status: "running".into(),
            reason: "already running",
        });
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let missing = ApiError::from(JobError::NotFound(JobId(7)));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::from(JobError::InvalidArgument("unknown task".into()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
