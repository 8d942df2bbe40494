//! # Dish Client
//!
//! High-level API over `ResourceClient<Dish>`, and the backing query the
//! [`DishCatalog`](crate::catalog::DishCatalog) falls back to on a cache miss.
use crate::catalog::BackingStore;
use crate::dish_actor::{DishAction, DishError};
use crate::model::{
    CategoryId, Dish, DishCreate, DishId, DishQuery, DishStatus, DishUpdate, DishView,
};
use async_trait::async_trait;
use store_actor::{ActorClient, FrameworkError, ResourceClient};
use tracing::{debug, info, instrument};

/// Client for interacting with the Dish actor.
#[derive(Clone)]
pub struct DishClient {
    inner: ResourceClient<Dish>,
}

impl DishClient {
    pub fn new(inner: ResourceClient<Dish>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self))]
    pub async fn create_dish(&self, params: DishCreate) -> Result<DishId, DishError> {
        debug!("Sending create_dish to actor");
        let id = self.inner.create(params).await?;
        info!(dish_id = %id, "Dish created");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn update_dish(&self, id: DishId, update: DishUpdate) -> Result<Dish, DishError> {
        Ok(self.inner.update(id, update).await?)
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, id: DishId, status: DishStatus) -> Result<Dish, DishError> {
        Ok(self
            .inner
            .perform_action(id, DishAction::SetStatus(status))
            .await?)
    }
}

#[async_trait]
impl ActorClient<Dish> for DishClient {
    type Error = DishError;

    fn inner(&self) -> &ResourceClient<Dish> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> DishError {
        DishError::from(e)
    }
}

#[async_trait]
impl BackingStore for DishClient {
    type Error = DishError;

    async fn list_enabled(&self, category_id: CategoryId) -> Result<Vec<DishView>, DishError> {
        let query = DishQuery {
            category_id,
            status: Some(DishStatus::Enabled),
        };
        let dishes = self.list(query).await?;
        Ok(dishes.into_iter().map(DishView::from).collect())
    }
}
