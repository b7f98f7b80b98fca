//! In-memory [`CacheBackend`] mirroring Redis sorted-set semantics.
//!
//! Every mutating call holds one lock for its whole batch. The backend can
//! be switched into a failing mode to exercise degraded paths.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use vitals_core::error::CacheError;

use crate::backend::CacheBackend;

#[derive(Default)]
struct State {
    sets: HashMap<String, BTreeSet<(i64, String)>>,
    hashes: HashMap<String, HashMap<String, i64>>,
}

#[derive(Default)]
pub struct MemoryCacheBackend {
    state: Mutex<State>,
    failing: AtomicBool,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`CacheError::Backend`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of members stored under `key`.
    pub fn len(&self, key: &str) -> usize {
        self.state
            .lock()
            .map(|s| s.sets.get(key).map_or(0, BTreeSet::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("connection refused".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| CacheError::Backend("memory cache lock poisoned".to_string()))
    }
}

fn insert(set: &mut BTreeSet<(i64, String)>, score: i64, member: &str) {
    set.retain(|(_, m)| m != member);
    set.insert((score, member.to_string()));
}

fn trim(set: &mut BTreeSet<(i64, String)>, keep: usize) {
    while set.len() > keep {
        set.pop_first();
    }
}

/// Resolve a Redis-style inclusive index range against `len` entries.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn add_and_trim(
        &self,
        key: &str,
        score: i64,
        member: &str,
        keep: usize,
    ) -> Result<(), CacheError> {
        let mut state = self.lock()?;
        let set = state.sets.entry(key.to_string()).or_default();
        insert(set, score, member);
        trim(set, keep);
        if set.is_empty() {
            state.sets.remove(key);
        }
        Ok(())
    }

    async fn replace(
        &self,
        key: &str,
        entries: &[(i64, String)],
        keep: usize,
    ) -> Result<(), CacheError> {
        let mut state = self.lock()?;
        let mut set = BTreeSet::new();
        for (score, member) in entries {
            insert(&mut set, *score, member);
        }
        trim(&mut set, keep);
        if set.is_empty() {
            state.sets.remove(key);
        } else {
            state.sets.insert(key.to_string(), set);
        }
        Ok(())
    }

    async fn rev_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CacheError> {
        let state = self.lock()?;
        let Some(set) = state.sets.get(key) else {
            return Ok(Vec::new());
        };
        let Some((start, stop)) = resolve_range(set.len(), start, stop) else {
            return Ok(Vec::new());
        };
        Ok(set
            .iter()
            .rev()
            .skip(start)
            .take(stop - start + 1)
            .map(|(_, member)| member.clone())
            .collect())
    }

    async fn incr_field(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError> {
        let mut state = self.lock()?;
        let value = state
            .hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert(0);
        *value += delta;
        Ok(*value)
    }

    async fn get_field(&self, key: &str, field: &str) -> Result<Option<i64>, CacheError> {
        let state = self.lock()?;
        Ok(state.hashes.get(key).and_then(|h| h.get(field)).copied())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.lock().map(|_| ())
    }
}
