//! HTTP surface of the coordinator

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tracing::warn;
use uuid::Uuid;

use crate::coordinator::{Coordinator, JobId, RunRequest};

/// Routes: `POST /runs`, `GET /runs/{id}`, `GET /health`
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/runs", post(submit_run))
        .route("/runs/{id}", get(run_status))
        .with_state(coordinator)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn submit_run(
    State(coordinator): State<Arc<Coordinator>>,
    Json(request): Json<RunRequest>,
) -> impl IntoResponse {
    match coordinator.submit(request) {
        Ok(id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({"id": id})),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Rejected run request");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

async fn run_status(
    State(coordinator): State<Arc<Coordinator>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match coordinator.status(JobId(id)) {
        Some(status) => Json(status).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Run not found"})),
        )
            .into_response(),
    }
}
