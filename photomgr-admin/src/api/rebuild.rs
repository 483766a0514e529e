//! Rebuild API handlers
//!
//! POST /api/rebuild, GET /api/rebuild/status, GET /api/rebuild/events

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    services::{RebuildTask, StartOutcome},
    AppState,
};

/// POST /api/rebuild response
#[derive(Debug, Serialize)]
pub struct StartRebuildResponse {
    pub status: &'static str,
    pub run_id: Uuid,
}

/// POST /api/rebuild
///
/// Returns as soon as the run is accepted; 409 while another run is active.
pub async fn start_rebuild(State(state): State<AppState>) -> ApiResult<Json<StartRebuildResponse>> {
    match state.rebuild.start().await {
        StartOutcome::Accepted { run_id } => Ok(Json(StartRebuildResponse {
            status: "started",
            run_id,
        })),
        StartOutcome::AlreadyRunning => Err(ApiError::Conflict(
            "Rebuild is already running".to_string(),
        )),
    }
}

/// GET /api/rebuild/status
pub async fn rebuild_status(State(state): State<AppState>) -> Json<RebuildTask> {
    Json(state.rebuild.status().await)
}

/// Build rebuild routes
pub fn rebuild_routes() -> Router<AppState> {
    Router::new()
        .route("/api/rebuild", post(start_rebuild))
        .route("/api/rebuild/status", get(rebuild_status))
        .route("/api/rebuild/events", get(super::sse::rebuild_event_stream))
}
