//! Handlers for the `/vitals` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use vitals_core::vitals::VitalSubmission;

use crate::error::{AppError, AppResult};
use crate::query::RangeParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/vitals
///
/// Validate a reading and queue it for persistence. Returns 202 with the
/// worker ID and job ID; the reading becomes readable once the job runs.
pub async fn submit_vitals(
    State(state): State<AppState>,
    Json(input): Json<VitalSubmission>,
) -> AppResult<impl IntoResponse> {
    let receipt = state.service.submit(input).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: receipt })))
}

/// GET /api/v1/vitals/{worker_id}/recent
///
/// The worker's ten most recent readings, newest first.
pub async fn get_recent_vitals(
    State(state): State<AppState>,
    Path(worker_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let records = state.service.fetch_recent(&worker_id).await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/vitals/{worker_id}/range?start=&end=
///
/// Every reading with `start <= timestamp <= end`, newest first. An
/// inverted range yields an empty list.
pub async fn get_vitals_in_range(
    State(state): State<AppState>,
    Path(worker_id): Path<String>,
    Query(params): Query<RangeParams>,
) -> AppResult<impl IntoResponse> {
    if worker_id.trim().is_empty() {
        return Err(AppError::BadRequest("Worker ID is required".to_string()));
    }
    let records = state
        .service
        .fetch_range(&worker_id, params.start, params.end)
        .await?;
    Ok(Json(DataResponse { data: records }))
}
