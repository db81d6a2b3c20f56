//! Thread-safe counters for asserting on request and event counts.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-key signed counts.
#[derive(Debug)]
pub struct Counter<K> {
    values: Mutex<HashMap<K, i64>>,
}

impl<K> Default for Counter<K> {
    fn default() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> Counter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, i64>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, key: K, delta: i64) {
        *self.lock().entry(key).or_insert(0) += delta;
    }

    pub fn get(&self, key: &K) -> i64 {
        self.lock().get(key).copied().unwrap_or(0)
    }

    /// Snapshot of all counts.
    pub fn values(&self) -> HashMap<K, i64> {
        self.lock().clone()
    }

    /// Keys whose count differs from `want`, mapped to `got - want`.
    /// Missing keys count as zero on either side.
    pub fn diff(&self, want: &HashMap<K, i64>) -> HashMap<K, i64> {
        let got = self.lock();
        let mut diff = HashMap::new();
        for (key, value) in got.iter() {
            let delta = value - want.get(key).copied().unwrap_or(0);
            if delta != 0 {
                diff.insert(key.clone(), delta);
            }
        }
        for (key, value) in want {
            if !got.contains_key(key) && *value != 0 {
                diff.insert(key.clone(), -value);
            }
        }
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn diff_reports_only_mismatches() {
        let c = Counter::new();
        c.add("get", 2);
        c.add("put", 1);
        c.add("put", -1);

        let want = HashMap::from([("get", 2), ("head", 1)]);
        assert_eq!(c.diff(&want), HashMap::from([("head", -1)]));

        c.add("head", 3);
        assert_eq!(c.diff(&want), HashMap::from([("head", 2)]));
    }

    #[test]
    fn concurrent_adds() {
        let c = Arc::new(Counter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = c.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        c.add("k".to_string(), 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(c.get(&"k".to_string()), 800);
        assert_eq!(c.values().len(), 1);
    }
}
