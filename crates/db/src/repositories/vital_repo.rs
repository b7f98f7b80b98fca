//! Repository for the `vital_records` table.

use sqlx::PgPool;
use vitals_core::types::Timestamp;
use vitals_core::vitals::VitalSubmission;

use crate::models::vital::VitalRow;

/// Column list for `vital_records` queries.
const COLUMNS: &str = "id, worker_id, heart_rate, temperature, recorded_at";

/// Provides create and read operations for vital records.
pub struct VitalRepo;

impl VitalRepo {
    /// Insert a new record. The database assigns `id`, and `recorded_at`
    /// when the submission carries no timestamp.
    pub async fn create(pool: &PgPool, input: &VitalSubmission) -> Result<VitalRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO vital_records (worker_id, heart_rate, temperature, recorded_at) \
             VALUES ($1, $2, $3, COALESCE($4, NOW())) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VitalRow>(&query)
            .bind(&input.worker_id)
            .bind(input.heart_rate)
            .bind(input.temperature)
            .bind(input.timestamp)
            .fetch_one(pool)
            .await
    }

    /// Most recent records for a worker, newest first.
    pub async fn find_recent_by_worker(
        pool: &PgPool,
        worker_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VitalRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM vital_records \
             WHERE worker_id = $1 \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, VitalRow>(&query)
            .bind(worker_id)
            .bind(limit.max(0))
            .bind(offset.max(0))
            .fetch_all(pool)
            .await
    }

    /// Records for a worker with `start <= recorded_at <= end`, newest first.
    ///
    /// An inverted range simply matches nothing.
    pub async fn find_by_worker_in_range(
        pool: &PgPool,
        worker_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<VitalRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM vital_records \
             WHERE worker_id = $1 AND recorded_at >= $2 AND recorded_at <= $3 \
             ORDER BY recorded_at DESC, id DESC"
        );
        sqlx::query_as::<_, VitalRow>(&query)
            .bind(worker_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }
}
