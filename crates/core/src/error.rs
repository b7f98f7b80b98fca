//! Error taxonomy for the vitals pipeline.
//!
//! Each layer owns one enum so callers can tell, by type alone, whether a
//! failure is fatal to them:
//!
//! - [`CoreError`]: caller input and lookups.
//! - [`QueueError`]: enqueue and job bookkeeping. `Unavailable` fails ingest.
//! - [`StoreError`]: durable store failures, split by retryability.
//! - [`CacheError`]: never propagated past the cache layer.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures reported by the durable store adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend understood and rejected the request (constraint
    /// violation). Retrying the same input fails the same way.
    #[error("Store rejected request ({code}): {message}")]
    Known { code: String, message: String },

    /// The backend could not be reached (pool timeout, I/O, closed pool).
    #[error("Store unreachable: {0}")]
    Connectivity(String),

    /// Any other backend failure.
    #[error("Store failure: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Whether the queue should schedule another attempt for this failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Known { .. })
    }
}

/// Failures inside the recency cache. Logged and collapsed into a miss or a
/// skipped write; they never reach an API caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache operation timed out after {0}ms")]
    Timeout(u64),

    #[error("Cache payload could not be (de)serialized: {0}")]
    Serialization(String),
}

/// Failures reported by the write queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The queue backend could not accept or update the job.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    #[error("Job {0} not found")]
    NotFound(crate::types::JobId),

    #[error("Job payload could not be (de)serialized: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_store_errors_are_not_retryable() {
        let err = StoreError::Known {
            code: "23514".into(),
            message: "check constraint".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn connectivity_and_unknown_store_errors_are_retryable() {
        assert!(StoreError::Connectivity("pool timed out".into()).is_retryable());
        assert!(StoreError::Unknown("boom".into()).is_retryable());
    }

    #[test]
    fn display_cache_timeout() {
        assert_eq!(
            CacheError::Timeout(250).to_string(),
            "Cache operation timed out after 250ms"
        );
    }

    #[test]
    fn display_queue_not_found() {
        assert_eq!(QueueError::NotFound(7).to_string(), "Job 7 not found");
    }
}
