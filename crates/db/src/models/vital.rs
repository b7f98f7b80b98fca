//! Vital record rows (`vital_records` table).

use sqlx::FromRow;
use vitals_core::types::{RecordId, Timestamp};
use vitals_core::vitals::VitalRecord;

/// A row from the `vital_records` table.
#[derive(Debug, Clone, FromRow)]
pub struct VitalRow {
    pub id: RecordId,
    pub worker_id: String,
    pub heart_rate: f64,
    pub temperature: f64,
    pub recorded_at: Timestamp,
}

impl From<VitalRow> for VitalRecord {
    fn from(row: VitalRow) -> Self {
        VitalRecord {
            id: row.id,
            worker_id: row.worker_id,
            heart_rate: row.heart_rate,
            temperature: row.temperature,
            timestamp: row.recorded_at,
        }
    }
}
