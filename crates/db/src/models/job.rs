//! Queue job rows (`queue_jobs` table).

use sqlx::FromRow;
use vitals_core::types::{JobId, Timestamp};

use super::status::StatusId;

/// Column list for `queue_jobs` queries.
pub const COLUMNS: &str = "\
    id, queue_name, name, payload, priority, state_id, \
    attempts_made, max_attempts, backoff_ms, \
    remove_on_complete, remove_on_fail, \
    available_at, failed_reason, created_at, processed_on, finished_on";

/// A row from the `queue_jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: JobId,
    pub queue_name: String,
    pub name: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub state_id: StatusId,
    pub attempts_made: i32,
    pub max_attempts: i32,
    pub backoff_ms: i64,
    pub remove_on_complete: i32,
    pub remove_on_fail: i32,
    pub available_at: Timestamp,
    pub failed_reason: Option<String>,
    pub created_at: Timestamp,
    pub processed_on: Option<Timestamp>,
    pub finished_on: Option<Timestamp>,
}

/// Insert payload for a new waiting job.
#[derive(Debug, Clone)]
pub struct InsertJob {
    pub name: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub max_attempts: i32,
    pub backoff_ms: i64,
    pub remove_on_complete: i32,
    pub remove_on_fail: i32,
}
