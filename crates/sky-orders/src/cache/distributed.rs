//! The shared cache the loader populates.
//!
//! Values are stored as serialised text, the way a networked key-value cache holds them.
//! [`InMemoryCache`] is the in-process implementation; expiry is checked on read against
//! Tokio's clock, so paused-time tests can step past a TTL.

use super::error::CacheError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[async_trait]
pub trait DistributedCache: Send + Sync {
    /// Returns the live value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value wholesale.
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration)
        -> Result<(), CacheError>;

    /// Removes `key` so the next read reloads it.
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}

#[async_trait]
impl<C: DistributedCache + ?Sized> DistributedCache for Arc<C> {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key).await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        (**self).set_with_ttl(key, value, ttl).await
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        (**self).invalidate(key).await
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until they are read or purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

#[async_trait]
impl DistributedCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
