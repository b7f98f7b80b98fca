use axum::routing::{get, post};
use axum::Router;

use crate::handlers::vitals;
use crate::state::AppState;

/// Routes mounted at `/vitals`.
///
/// ```text
/// POST   /                     -> submit_vitals
/// GET    /{worker_id}/recent   -> get_recent_vitals
/// GET    /{worker_id}/range    -> get_vitals_in_range
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(vitals::submit_vitals))
        .route("/{worker_id}/recent", get(vitals::get_recent_vitals))
        .route("/{worker_id}/range", get(vitals::get_vitals_in_range))
}
