/// Store-assigned identity of a vital record.
pub type RecordId = uuid::Uuid;

/// Queue job primary keys are PostgreSQL BIGSERIAL.
pub type JobId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
