//! Primary/replica target selection.

use std::sync::atomic::{AtomicUsize, Ordering};

/// One write target and zero or more read targets.
///
/// Reads rotate round-robin across the replicas, advancing one position per
/// call and wrapping at the replica count. The rotation index is an atomic
/// owned by this instance; concurrent readers may skew the distribution but
/// never observe an out-of-range index.
#[derive(Debug)]
pub struct ReplicaSet<T> {
    primary: T,
    replicas: Vec<T>,
    next: AtomicUsize,
}

impl<T> ReplicaSet<T> {
    pub fn new(primary: T, replicas: Vec<T>) -> Self {
        Self {
            primary,
            replicas,
            next: AtomicUsize::new(0),
        }
    }

    /// The write target.
    pub fn primary(&self) -> &T {
        &self.primary
    }

    /// Pick the next read target. Falls back to the primary when no
    /// replicas are configured.
    pub fn read(&self) -> &T {
        let count = self.replicas.len();
        if count == 0 {
            return &self.primary;
        }

        let index = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| Some((i + 1) % count))
            .unwrap_or_else(|i| i);

        &self.replicas[index % count]
    }

    /// Primary first, then every replica.
    pub fn all(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.primary).chain(self.replicas.iter())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn reads_rotate_and_wrap() {
        let set = ReplicaSet::new("primary", vec!["r1", "r2"]);
        let picks: Vec<&str> = (0..5).map(|_| *set.read()).collect();
        assert_eq!(picks, vec!["r1", "r2", "r1", "r2", "r1"]);
    }

    #[test]
    fn writes_always_hit_primary() {
        let set = ReplicaSet::new("primary", vec!["r1", "r2"]);
        set.read();
        assert_eq!(*set.primary(), "primary");
    }

    #[test]
    fn reads_fall_back_to_primary_without_replicas() {
        let set: ReplicaSet<&str> = ReplicaSet::new("primary", Vec::new());
        assert_eq!(*set.read(), "primary");
        assert_eq!(*set.read(), "primary");
    }

    #[test]
    fn all_lists_primary_then_replicas() {
        let set = ReplicaSet::new("primary", vec!["r1", "r2"]);
        let all: Vec<&str> = set.all().copied().collect();
        assert_eq!(all, vec!["primary", "r1", "r2"]);
    }

    #[test]
    fn concurrent_reads_stay_in_range_and_balanced() {
        let set = Arc::new(ReplicaSet::new(0usize, vec![1usize, 2, 3]));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let set = Arc::clone(&set);
                std::thread::spawn(move || (0..300).map(|_| *set.read()).collect::<Vec<_>>())
            })
            .collect();

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for handle in handles {
            for pick in handle.join().unwrap() {
                *counts.entry(pick).or_default() += 1;
            }
        }

        assert!(!counts.contains_key(&0), "reads must not hit the primary");
        // fetch_update is a CAS loop, so every call advances exactly once.
        assert_eq!(counts.values().sum::<usize>(), 1200);
        for replica in 1..=3 {
            assert_eq!(counts[&replica], 400);
        }
    }
}
