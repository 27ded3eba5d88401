//! Per-key single-flight memoization.
//!
//! The first caller for a key runs the computation; concurrent callers for the
//! same key block on it and receive a clone of the same value. Later callers
//! get the stored value without recomputing.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, OnceLock};

pub(crate) struct SingleFlight<K, V> {
    slots: Mutex<HashMap<K, Arc<OnceLock<V>>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_run(&self, key: &K, compute: impl FnOnce() -> V) -> V {
        let slot = {
            let mut slots = match self.slots.lock() {
                Ok(s) => s,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        // The map lock is released; only this key's slot is held while computing.
        slot.get_or_init(compute).clone()
    }

    /// Number of keys that have a finished value.
    pub fn len(&self) -> usize {
        match self.slots.lock() {
            Ok(s) => s.values().filter(|v| v.get().is_some()).count(),
            Err(poisoned) => poisoned.into_inner().values().filter(|v| v.get().is_some()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn concurrent_callers_share_one_computation() {
        let memo: SingleFlight<&str, usize> = SingleFlight::new();
        let runs = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let v = memo.get_or_run(&"k", || {
                        std::thread::sleep(Duration::from_millis(20));
                        runs.fetch_add(1, Ordering::SeqCst) + 41
                    });
                    assert_eq!(v, 41);
                });
            }
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn distinct_keys_compute_independently() {
        let memo: SingleFlight<u32, u32> = SingleFlight::new();
        assert_eq!(memo.get_or_run(&1, || 10), 10);
        assert_eq!(memo.get_or_run(&2, || 20), 20);
        assert_eq!(memo.get_or_run(&1, || 99), 10);
    }
}
