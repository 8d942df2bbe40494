//! Single-flight read-through loading.
//!
//! On a miss, concurrent callers for the same key queue on that key's mutex; the first one
//! runs the backing query and stores the result, the rest find it on their re-check. Callers
//! for different keys never wait on each other.

use super::distributed::DistributedCache;
use super::error::CacheError;
use super::lock_registry::LockRegistry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

pub struct SingleFlightLoader<C> {
    cache: C,
    locks: LockRegistry,
    ttl: Duration,
    lock_timeout: Option<Duration>,
}

impl<C: DistributedCache> SingleFlightLoader<C> {
    /// Entries written by this loader live for `ttl`. Lock waits are unbounded until
    /// [`with_lock_timeout`](Self::with_lock_timeout) says otherwise.
    pub fn new(cache: C, ttl: Duration) -> Self {
        Self {
            cache,
            locks: LockRegistry::new(),
            ttl,
            lock_timeout: None,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached list for `key`, running `load` at most once per miss.
    ///
    /// The lock-free fast path only trusts a non-empty cached list. Under the lock, any
    /// cached value counts, empty included, so a category with no items is queried once per
    /// TTL rather than once per caller. A failed `load` writes nothing.
    pub async fn get_or_load<V, F, Fut, E>(&self, key: &str, load: F) -> Result<Vec<V>, CacheError>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<V>, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        if let Some(values) = self.read::<V>(key).await? {
            if !values.is_empty() {
                debug!(key, "Cache hit");
                return Ok(values);
            }
        }

        let lock = self.locks.lock_for(key);
        let _guard = match self.lock_timeout {
            Some(limit) => tokio::time::timeout(limit, lock.lock())
                .await
                .map_err(|_| CacheError::LockTimeout {
                    key: key.to_string(),
                    waited: limit,
                })?,
            None => lock.lock().await,
        };

        if let Some(values) = self.read::<V>(key).await? {
            debug!(key, "Cache filled by another loader");
            return Ok(values);
        }

        debug!(key, "Cache miss, querying backing store");
        let values = load().await.map_err(|e| CacheError::BackingStore {
            key: key.to_string(),
            source: Box::new(e),
        })?;

        let encoded = serde_json::to_string(&values).map_err(|e| CacheError::Codec {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        // The caller still gets the loaded values when the write fails; the next miss retries.
        if let Err(e) = self.cache.set_with_ttl(key, encoded, self.ttl).await {
            warn!(key, error = %e, "Failed to populate cache");
        }
        Ok(values)
    }

    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(key).await
    }

    async fn read<V: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<V>>, CacheError> {
        let Some(raw) = self.cache.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(values) => Ok(Some(values)),
            Err(e) => {
                warn!(key, error = %e, "Ignoring undecodable cache entry");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    #[error("backing store down")]
    struct Down;

    fn loader() -> SingleFlightLoader<Arc<InMemoryCache>> {
        SingleFlightLoader::new(Arc::new(InMemoryCache::new()), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_hit_skips_backing_query() {
        let loader = loader();
        let calls = &AtomicUsize::new(0);

        for _ in 0..3 {
            let values = loader
                .get_or_load("dish_1", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Down>(vec![1u32, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(values, vec![1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_cached_but_rechecked_under_lock() {
        let loader = loader();
        let calls = &AtomicUsize::new(0);

        for _ in 0..2 {
            let values: Vec<u32> = loader
                .get_or_load("dish_2", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Down>(vec![])
                })
                .await
                .unwrap();
            assert!(values.is_empty());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(loader.cache().get("dish_2").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_failed_load_caches_nothing() {
        let loader = loader();
        let err = loader
            .get_or_load::<u32, _, _, _>("dish_3", || async { Err(Down) })
            .await
            .unwrap_err();
        assert!(err.backing_error::<Down>().is_some());
        assert!(loader.cache().get("dish_3").await.unwrap().is_none());

        let values = loader
            .get_or_load("dish_3", || async { Ok::<_, Down>(vec![7u32]) })
            .await
            .unwrap();
        assert_eq!(values, vec![7]);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_reloaded() {
        let loader = loader();
        loader
            .cache()
            .set_with_ttl("dish_4", "not json".into(), Duration::from_secs(60))
            .await
            .unwrap();

        let values = loader
            .get_or_load("dish_4", || async { Ok::<_, Down>(vec![4u32]) })
            .await
            .unwrap();
        assert_eq!(values, vec![4]);
    }
}
