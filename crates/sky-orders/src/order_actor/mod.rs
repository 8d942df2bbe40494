//! # Order Actor
//!
//! The Order Store: a [`ResourceActor<Order>`](store_actor::ResourceActor) plus the
//! conditional transitions in [`OrderAction`].
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](store_actor::ActorEntity) implementation for
//!   [`Order`](crate::model::Order)
//! - [`actions`] - [`OrderAction`] and [`TransitionOutcome`]
//! - [`error`] - [`OrderError`]
//! - [`new()`] - factory for the actor and its client
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (actor, client) = order_actor::new(32);
//! tokio::spawn(actor.run(()));
//!
//! let id = client.create_order(OrderCreate { user_id: 7, amount: 42.0 }).await?;
//! client.mark_paid(id).await?;
//! ```

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;

use crate::clients::OrderClient;
use crate::model::Order;
use store_actor::ResourceActor;

/// Creates a new Order actor and its client.
pub fn new(buffer_size: usize) -> (ResourceActor<Order>, OrderClient) {
    let (actor, generic_client) = ResourceActor::new(buffer_size);
    (actor, OrderClient::new(generic_client))
}
