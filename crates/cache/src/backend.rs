use async_trait::async_trait;
use vitals_core::error::CacheError;

/// Sorted-set-per-key storage with a small hash side channel.
///
/// Ranks follow Redis: ascending by `(score, member)`, members unique per
/// key, negative indices count from the end. Methods that mutate more than
/// one thing apply as a single atomic batch.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Add `member` at `score`, then drop the lowest-ranked entries until at
    /// most `keep` remain.
    async fn add_and_trim(
        &self,
        key: &str,
        score: i64,
        member: &str,
        keep: usize,
    ) -> Result<(), CacheError>;

    /// Delete the set, insert every `(score, member)`, then trim to `keep`.
    async fn replace(
        &self,
        key: &str,
        entries: &[(i64, String)],
        keep: usize,
    ) -> Result<(), CacheError>;

    /// Members from highest to lowest rank, `start..=stop` inclusive.
    async fn rev_range(&self, key: &str, start: isize, stop: isize)
        -> Result<Vec<String>, CacheError>;

    /// Increment an integer hash field, returning the new value.
    async fn incr_field(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError>;

    async fn get_field(&self, key: &str, field: &str) -> Result<Option<i64>, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}
