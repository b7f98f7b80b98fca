pub mod health;
pub mod queue;
pub mod vitals;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /vitals                              submit (POST)
/// /vitals/{worker_id}/recent           most recent readings
/// /vitals/{worker_id}/range            readings in [start, end]
///
/// /queue/stats                         job counts per state
/// /queue/jobs/{id}                     job status
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/vitals", vitals::router())
        .nest("/queue", queue::router())
}
