//! Vital records, ingest submissions, and their validation rules.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::types::{RecordId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of records retained per worker in the recency cache.
pub const MAX_PER_WORKER: usize = 10;

/// Page size used by the recent-vitals read path.
pub const DEFAULT_LIMIT: i64 = 10;

/// Offset used by the recent-vitals read path.
pub const DEFAULT_OFFSET: i64 = 0;

/// Readings are stored with two decimal places.
const DECIMAL_PRECISION: f64 = 100.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A persisted biometric reading. Immutable once the store returns it.
///
/// The camelCase JSON form is also the member payload stored in the
/// recency cache, so a cache hit returns exactly what the store persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalRecord {
    pub id: RecordId,
    pub worker_id: String,
    pub heart_rate: f64,
    pub temperature: f64,
    pub timestamp: Timestamp,
}

impl VitalRecord {
    /// Ordering key used by the recency cache (epoch milliseconds).
    pub fn score(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Raw ingest payload. Queued as-is and persisted by the record processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VitalSubmission {
    #[validate(
        length(
            min = 3,
            max = 50,
            message = "Worker ID must be between 3 and 50 characters"
        ),
        custom(function = "validate_worker_id_chars")
    )]
    pub worker_id: String,

    #[validate(range(
        min = 30.0,
        max = 300.0,
        message = "Heart rate must be between 30 and 300 bpm"
    ))]
    pub heart_rate: f64,

    #[validate(range(
        min = 20.0,
        max = 50.0,
        message = "Temperature must be between 20 and 50 °C"
    ))]
    pub temperature: f64,

    /// Reading time. The store assigns the creation time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl VitalSubmission {
    /// Trim the worker ID, round readings to two decimals, and validate.
    pub fn normalize(self) -> Result<Self, CoreError> {
        if !self.heart_rate.is_finite() || !self.temperature.is_finite() {
            return Err(CoreError::Validation(
                "Heart rate and temperature must be finite numbers".to_string(),
            ));
        }

        let normalized = Self {
            worker_id: self.worker_id.trim().to_string(),
            heart_rate: round_reading(self.heart_rate),
            temperature: round_reading(self.temperature),
            timestamp: self.timestamp,
        };

        normalized
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        Ok(normalized)
    }
}

/// Round a reading to the stored precision.
pub fn round_reading(value: f64) -> f64 {
    (value * DECIMAL_PRECISION).round() / DECIMAL_PRECISION
}

/// Worker IDs may contain only letters, numbers, hyphens, and underscores.
fn validate_worker_id_chars(worker_id: &str) -> Result<(), ValidationError> {
    let valid = worker_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("worker_id_format");
        err.message = Some(
            "Worker ID can only contain letters, numbers, hyphens, and underscores".into(),
        );
        Err(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    fn submission(worker_id: &str, heart_rate: f64, temperature: f64) -> VitalSubmission {
        VitalSubmission {
            worker_id: worker_id.to_string(),
            heart_rate,
            temperature,
            timestamp: None,
        }
    }

    #[test]
    fn normalize_trims_and_rounds() {
        let normalized = submission("  worker-123 ", 72.456, 36.504)
            .normalize()
            .unwrap();
        assert_eq!(normalized.worker_id, "worker-123");
        assert_eq!(normalized.heart_rate, 72.46);
        assert_eq!(normalized.temperature, 36.5);
    }

    #[test]
    fn normalize_rejects_out_of_range_heart_rate() {
        assert_matches!(
            submission("worker-123", 29.0, 36.5).normalize(),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            submission("worker-123", 301.0, 36.5).normalize(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn normalize_rejects_out_of_range_temperature() {
        assert_matches!(
            submission("worker-123", 72.0, 19.99).normalize(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn normalize_rejects_bad_worker_ids() {
        assert_matches!(
            submission("ab", 72.0, 36.5).normalize(),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            submission("worker 123", 72.0, 36.5).normalize(),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            submission(&"w".repeat(51), 72.0, 36.5).normalize(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn normalize_rejects_non_finite_readings() {
        assert_matches!(
            submission("worker-123", f64::NAN, 36.5).normalize(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn submission_uses_camel_case_and_optional_timestamp() {
        let parsed: VitalSubmission = serde_json::from_str(
            r#"{"workerId":"worker-123","heartRate":72,"temperature":36.5}"#,
        )
        .unwrap();
        assert_eq!(parsed.worker_id, "worker-123");
        assert!(parsed.timestamp.is_none());

        let json = serde_json::to_value(&parsed).unwrap();
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn record_score_is_epoch_millis() {
        let record = VitalRecord {
            id: uuid::Uuid::nil(),
            worker_id: "worker-123".into(),
            heart_rate: 72.0,
            temperature: 36.5,
            timestamp: chrono::Utc.timestamp_millis_opt(1_704_110_400_123).unwrap(),
        };
        assert_eq!(record.score(), 1_704_110_400_123);
    }
}
