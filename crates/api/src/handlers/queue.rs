//! Handlers for queue introspection and control.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use vitals_core::types::JobId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/queue/stats
pub async fn get_queue_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let counts = state.service.queue_stats().await?;
    Ok(Json(DataResponse { data: counts }))
}

/// GET /api/v1/queue/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state.service.job_status(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

#[derive(Debug, Serialize)]
pub struct QueueStatus {
    pub paused: bool,
}

#[derive(Debug, Serialize)]
pub struct CleanResult {
    pub removed: u64,
}

/// GET /api/v1/queue/status
pub async fn get_queue_status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let paused = state.service.queue_paused().await?;
    Ok(Json(DataResponse {
        data: QueueStatus { paused },
    }))
}

/// POST /api/v1/queue/pause
///
/// Workers stop claiming jobs. Submissions keep queueing.
pub async fn pause_queue(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    state.service.pause_queue().await?;
    Ok(Json(DataResponse {
        data: QueueStatus { paused: true },
    }))
}

/// POST /api/v1/queue/resume
pub async fn resume_queue(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    state.service.resume_queue().await?;
    Ok(Json(DataResponse {
        data: QueueStatus { paused: false },
    }))
}

/// POST /api/v1/queue/clean
///
/// Delete every completed and failed job.
pub async fn clean_queue(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let removed = state.service.clear_queue().await?;
    Ok(Json(DataResponse {
        data: CleanResult { removed },
    }))
}
