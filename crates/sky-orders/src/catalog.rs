//! # Dish Catalog
//!
//! The customer-facing "dishes of a category" read, served from the shared cache under key
//! `dish_{category_id}` and filled through the [`SingleFlightLoader`] on a miss.
//!
//! Any change to a category's dishes must be followed by
//! [`DishCatalog::evict_category`]; the cache does not watch the backing store.

use crate::cache::{CacheError, DistributedCache, SingleFlightLoader};
use crate::model::{CategoryId, DishView};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// The uncached query behind the catalog.
#[async_trait]
pub trait BackingStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Enabled dishes of a category, with their flavors.
    async fn list_enabled(&self, category_id: CategoryId) -> Result<Vec<DishView>, Self::Error>;
}

#[async_trait]
impl<B: BackingStore + ?Sized> BackingStore for Arc<B> {
    type Error = B::Error;

    async fn list_enabled(&self, category_id: CategoryId) -> Result<Vec<DishView>, Self::Error> {
        (**self).list_enabled(category_id).await
    }
}

pub fn cache_key(category_id: CategoryId) -> String {
    format!("dish_{category_id}")
}

pub struct DishCatalog<B, C> {
    store: B,
    loader: SingleFlightLoader<C>,
}

impl<B: BackingStore, C: DistributedCache> DishCatalog<B, C> {
    pub fn new(store: B, cache: C, ttl: Duration) -> Self {
        Self {
            store,
            loader: SingleFlightLoader::new(cache, ttl),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.loader = self.loader.with_lock_timeout(timeout);
        self
    }

    pub fn loader(&self) -> &SingleFlightLoader<C> {
        &self.loader
    }

    #[instrument(skip(self))]
    pub async fn list_with_flavor(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<DishView>, CacheError> {
        let key = cache_key(category_id);
        self.loader
            .get_or_load(&key, || self.store.list_enabled(category_id))
            .await
    }

    /// Drops the cached listing so the next read reloads it.
    #[instrument(skip(self))]
    pub async fn evict_category(&self, category_id: CategoryId) -> Result<(), CacheError> {
        self.loader.invalidate(&cache_key(category_id)).await?;
        info!("Category listing evicted");
        Ok(())
    }

    /// Drops per-key mutexes nobody is using.
    pub fn sweep_locks(&self) -> usize {
        self.loader.locks().evict_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key(CategoryId(12)), "dish_12");
    }
}
