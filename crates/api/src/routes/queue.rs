use axum::routing::{get, post};
use axum::Router;

use crate::handlers::queue;
use crate::state::AppState;

/// Routes mounted at `/queue`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(queue::get_queue_stats))
        .route("/jobs/{id}", get(queue::get_job))
        .route("/status", get(queue::get_queue_status))
        .route("/pause", post(queue::pause_queue))
        .route("/resume", post(queue::resume_queue))
        .route("/clean", post(queue::clean_queue))
}
