//! Per-key mutexes for collapsing concurrent cache misses.
//!
//! One mutex per key, created on first use by an atomic get-or-insert. Entries are never
//! removed implicitly; with many distinct keys call [`LockRegistry::evict_idle`]
//! periodically (see `PipelineConfig::lock_sweep_interval`).

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for `key`, creating it if absent.
    ///
    /// Concurrent first calls for the same key all receive the same mutex.
    pub fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        if let Some(existing) = self.locks.get(key) {
            return existing.value().clone();
        }
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Drops mutexes that nobody holds or waits on. Returns how many were removed.
    ///
    /// A caller keeps its `Arc` for as long as it waits on or holds the mutex, so an entry
    /// whose only reference is the registry's own is idle. `retain` runs under the shard
    /// write lock, which also excludes a concurrent `lock_for` cloning the same entry.
    pub fn evict_idle(&self) -> usize {
        let mut evicted = 0;
        self.locks.retain(|_, lock| {
            let idle = Arc::strong_count(lock) == 1;
            if idle {
                evicted += 1;
            }
            !idle
        });
        if evicted > 0 {
            debug!(evicted, remaining = self.locks.len(), "Evicted idle cache locks");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_same_mutex() {
        let registry = LockRegistry::new();
        let a = registry.lock_for("dish_1");
        let b = registry.lock_for("dish_1");
        let c = registry.lock_for("dish_2");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_creates_one_mutex() {
        let registry = Arc::new(LockRegistry::new());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move { registry.lock_for("dish_9") }));
        }
        let mut locks = Vec::new();
        for task in tasks {
            locks.push(task.await.unwrap());
        }
        assert!(locks.iter().all(|lock| Arc::ptr_eq(lock, &locks[0])));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_held_locks() {
        let registry = LockRegistry::new();
        let held = registry.lock_for("busy");
        let _guard = held.lock().await;
        drop(registry.lock_for("idle"));

        assert_eq!(registry.evict_idle(), 1);
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&held, &registry.lock_for("busy")));
    }
}
