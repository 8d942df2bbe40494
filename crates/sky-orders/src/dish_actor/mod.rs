//! # Dish Actor
//!
//! The catalog's backing store: a [`ResourceActor<Dish>`](store_actor::ResourceActor) whose
//! `List` request answers "enabled dishes of category N". Reads normally go through the
//! cached [`DishCatalog`](crate::catalog::DishCatalog) instead of hitting this actor.

pub mod error;

pub use error::*;

use crate::clients::DishClient;
use crate::model::{Dish, DishCreate, DishId, DishQuery, DishStatus, DishUpdate};
use async_trait::async_trait;
use store_actor::{ActorEntity, ResourceActor};

#[derive(Debug, Clone)]
pub enum DishAction {
    /// Put a dish on sale or take it off.
    SetStatus(DishStatus),
}

#[async_trait]
impl ActorEntity for Dish {
    type Id = DishId;
    type Create = DishCreate;
    type Update = DishUpdate;
    type Query = DishQuery;
    type Action = DishAction;
    type ActionResult = Dish;
    type Context = ();
    type Error = DishError;

    fn from_create_params(id: DishId, params: DishCreate) -> Result<Self, Self::Error> {
        if params.name.trim().is_empty() {
            return Err(DishError::ValidationError("dish name is empty".into()));
        }
        Ok(Dish {
            id,
            category_id: params.category_id,
            name: params.name,
            price: params.price,
            status: DishStatus::Disabled,
            flavors: params.flavors,
        })
    }

    fn matches(&self, query: &DishQuery) -> bool {
        self.category_id == query.category_id
            && query.status.map_or(true, |status| status == self.status)
    }

    async fn on_update(
        &mut self,
        update: DishUpdate,
        _ctx: &Self::Context,
    ) -> Result<(), Self::Error> {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(flavors) = update.flavors {
            self.flavors = flavors;
        }
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: DishAction,
        _ctx: &Self::Context,
    ) -> Result<Dish, Self::Error> {
        match action {
            DishAction::SetStatus(status) => self.status = status,
        }
        Ok(self.clone())
    }
}

/// Creates a new Dish actor and its client.
pub fn new(buffer_size: usize) -> (ResourceActor<Dish>, DishClient) {
    let (actor, generic_client) = ResourceActor::new(buffer_size);
    (actor, DishClient::new(generic_client))
}
