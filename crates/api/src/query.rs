//! Query parameter types for API handlers.

use serde::Deserialize;
use vitals_core::types::Timestamp;

/// `?start=&end=` for range reads. Both bounds are RFC 3339 timestamps and
/// inclusive.
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: Timestamp,
    pub end: Timestamp,
}
