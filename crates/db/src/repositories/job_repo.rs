//! Repository for the `queue_jobs` table.
//!
//! Uses `JobState` from `models::status` for every state transition.
//! Transitions out of `active` are guarded on the current state so a job
//! can only be finished by the worker that claimed it.

use sqlx::PgPool;
use vitals_core::types::JobId;

use crate::models::job::{InsertJob, JobRow, COLUMNS};
use crate::models::status::{JobState, StatusId};

/// Provides queue operations for background jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new waiting job, immediately available for claiming.
    pub async fn insert(
        pool: &PgPool,
        queue_name: &str,
        input: &InsertJob,
    ) -> Result<JobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO queue_jobs \
                 (queue_name, name, payload, priority, state_id, max_attempts, backoff_ms, \
                  remove_on_complete, remove_on_fail) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(queue_name)
            .bind(&input.name)
            .bind(&input.payload)
            .bind(input.priority)
            .bind(JobState::Waiting.id())
            .bind(input.max_attempts)
            .bind(input.backoff_ms)
            .bind(input.remove_on_complete)
            .bind(input.remove_on_fail)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the next available waiting job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// claim the same job. Lower `priority` values are served first, then
    /// oldest first. Returns `None` while the queue is paused.
    pub async fn claim_next(pool: &PgPool, queue_name: &str) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE queue_jobs \
             SET state_id = $2, processed_on = NOW() \
             WHERE id = ( \
                 SELECT id FROM queue_jobs \
                 WHERE queue_name = $1 AND state_id = $3 AND available_at <= NOW() \
                   AND NOT EXISTS (SELECT 1 FROM queue_pauses p WHERE p.queue_name = $1) \
                 ORDER BY priority ASC, available_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(queue_name)
            .bind(JobState::Active.id())
            .bind(JobState::Waiting.id())
            .fetch_optional(pool)
            .await
    }

    /// Recover jobs claimed more than `stall_ms` ago and never finished.
    ///
    /// The lost run counts as an attempt. Jobs with attempts left go back to
    /// `waiting`, available immediately; the rest move to `failed`. Returns
    /// the updated rows.
    pub async fn recover_stalled(
        pool: &PgPool,
        queue_name: &str,
        stall_ms: i64,
        reason: &str,
    ) -> Result<Vec<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE queue_jobs \
             SET attempts_made = attempts_made + 1, \
                 failed_reason = $3, \
                 state_id = CASE WHEN attempts_made + 1 >= max_attempts THEN $4 ELSE $5 END, \
                 finished_on = CASE WHEN attempts_made + 1 >= max_attempts THEN NOW() ELSE NULL END, \
                 available_at = NOW() \
             WHERE id IN ( \
                 SELECT id FROM queue_jobs \
                 WHERE queue_name = $1 AND state_id = $6 \
                   AND processed_on <= NOW() - ($2 * INTERVAL '1 millisecond') \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(queue_name)
            .bind(stall_ms.max(0) as f64)
            .bind(reason)
            .bind(JobState::Failed.id())
            .bind(JobState::Waiting.id())
            .bind(JobState::Active.id())
            .fetch_all(pool)
            .await
    }

    /// Stop claims on `queue_name`. Idempotent.
    pub async fn pause(pool: &PgPool, queue_name: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO queue_pauses (queue_name) VALUES ($1) \
             ON CONFLICT (queue_name) DO NOTHING",
        )
        .bind(queue_name)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Allow claims on `queue_name` again. Idempotent.
    pub async fn resume(pool: &PgPool, queue_name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM queue_pauses WHERE queue_name = $1")
            .bind(queue_name)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn is_paused(pool: &PgPool, queue_name: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM queue_pauses WHERE queue_name = $1)",
        )
        .bind(queue_name)
        .fetch_one(pool)
        .await
    }

    /// Mark an active job as completed. Returns the updated row, or `None`
    /// if the job was not active.
    pub async fn complete(pool: &PgPool, job_id: JobId) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE queue_jobs \
             SET state_id = $2, attempts_made = attempts_made + 1, finished_on = NOW() \
             WHERE id = $1 AND state_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job_id)
            .bind(JobState::Completed.id())
            .bind(JobState::Active.id())
            .fetch_optional(pool)
            .await
    }

    /// Put an active job back into `waiting`, available again after
    /// `delay_ms`.
    pub async fn retry_later(
        pool: &PgPool,
        job_id: JobId,
        attempts_made: i32,
        delay_ms: i64,
        reason: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE queue_jobs \
             SET state_id = $2, attempts_made = $3, failed_reason = $4, \
                 available_at = NOW() + ($5 * INTERVAL '1 millisecond') \
             WHERE id = $1 AND state_id = $6",
        )
        .bind(job_id)
        .bind(JobState::Waiting.id())
        .bind(attempts_made)
        .bind(reason)
        .bind(delay_ms as f64)
        .bind(JobState::Active.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move an active job to the terminal `failed` state. Returns the
    /// updated row, or `None` if the job was not active.
    pub async fn mark_failed(
        pool: &PgPool,
        job_id: JobId,
        attempts_made: i32,
        reason: &str,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE queue_jobs \
             SET state_id = $2, attempts_made = $3, failed_reason = $4, finished_on = NOW() \
             WHERE id = $1 AND state_id = $5 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job_id)
            .bind(JobState::Failed.id())
            .bind(attempts_made)
            .bind(reason)
            .bind(JobState::Active.id())
            .fetch_optional(pool)
            .await
    }

    /// Delete all but the `keep` most recently finished jobs in `state`.
    pub async fn prune(
        pool: &PgPool,
        queue_name: &str,
        state: JobState,
        keep: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM queue_jobs \
             WHERE queue_name = $1 AND state_id = $2 AND id NOT IN ( \
                 SELECT id FROM queue_jobs \
                 WHERE queue_name = $1 AND state_id = $2 \
                 ORDER BY finished_on DESC NULLS LAST, id DESC \
                 LIMIT $3 \
             )",
        )
        .bind(queue_name)
        .bind(state.id())
        .bind(keep.max(0))
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete every job in `state`.
    pub async fn delete_in_state(
        pool: &PgPool,
        queue_name: &str,
        state: JobState,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM queue_jobs WHERE queue_name = $1 AND state_id = $2")
            .bind(queue_name)
            .bind(state.id())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, job_id: JobId) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queue_jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Number of jobs per state.
    pub async fn count_by_state(
        pool: &PgPool,
        queue_name: &str,
    ) -> Result<Vec<(StatusId, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (StatusId, i64)>(
            "SELECT state_id, COUNT(*) FROM queue_jobs \
             WHERE queue_name = $1 \
             GROUP BY state_id",
        )
        .bind(queue_name)
        .fetch_all(pool)
        .await
    }
}
