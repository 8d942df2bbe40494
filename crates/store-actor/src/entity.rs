//! # ActorEntity Trait
//!
//! The `ActorEntity` trait is the contract a record type (Order, Dish, ...) implements to be
//! kept by a [`ResourceActor`](crate::ResourceActor). It names the identifier, the DTOs for
//! create and update, the query used by `list`, the custom actions, the injected context and
//! the error type.
//!
//! # Atomic Actions
//! `handle_action` runs inside the actor's message loop with exclusive `&mut self` access. No
//! other request for the same store interleaves with it, so an action that reads a field and
//! then writes another is a compare-and-set from the caller's point of view. Conditional
//! updates ("cancel only if still unpaid") belong here rather than in a get followed by an
//! update.
//!
//! # Provided Methods (Hooks)
//! - [`ActorEntity::on_create`]
//! - [`ActorEntity::on_delete`]
//!
//! The defaults do nothing (`Ok(())`).

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any record type must implement to be managed by `ResourceActor`.
///
/// # Async & Context
/// Hooks are `#[async_trait]` so they may await other clients. The `Context` type is
/// injected into every hook by [`ResourceActor::run`](crate::ResourceActor::run), which
/// allows late binding of dependencies.
#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// The unique identifier. Built from the actor's `u32` counter on create.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + From<u32>;

    /// The data required to create a new record.
    type Create: Send + Sync + Debug;

    /// The data required to update an existing record.
    type Update: Send + Sync + Debug;

    /// Filter accepted by `list`.
    type Query: Send + Sync + Debug;

    /// Record-specific operations (e.g. `CancelIfPending`).
    type Action: Send + Sync + Debug;

    /// The result type returned by custom actions.
    type ActionResult: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// One error enum per record type, shared by every hook and action.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct the full record from the ID and payload.
    /// This is called synchronously before `on_create`.
    fn from_create_params(id: Self::Id, params: Self::Create) -> Result<Self, Self::Error>;

    /// Whether this record belongs in the result of `list(query)`.
    fn matches(&self, query: &Self::Query) -> bool;

    /// Called after the record is built and before it is stored.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called when an update request is received. An error leaves the record untouched
    /// only if the implementation validates before mutating.
    async fn on_update(
        &mut self,
        update: Self::Update,
        _ctx: &Self::Context,
    ) -> Result<(), Self::Error>;

    /// Called immediately before the record is removed.
    async fn on_delete(&self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handle a custom record-specific action.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        _ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
