//! # Store Actor
//!
//! In-process record stores built on the **Actor Model**: one Tokio task owns a keyed map
//! of records and serves CRUD, List and custom Action requests sent by cloneable clients.
//!
//! ## Why an actor for a store?
//!
//! - **No locks**: the map is owned by a single task, requests are served one at a time.
//! - **Atomic actions**: an [`ActorEntity::Action`] reads and writes a record with no other
//!   request in between. A conditional update ("cancel only if the order is still pending")
//!   is a single action, so there is no read-then-write window for a concurrent payment to
//!   slip through.
//! - **Uniform API**: every record type gets the same client surface.
//!
//! ## Layers
//!
//! 1. **Entity** ([`ActorEntity`]) - the record, its DTOs, query filter and actions.
//! 2. **Runtime** ([`ResourceActor`]) - the message loop.
//! 3. **Interface** ([`ResourceClient`], [`ActorClient`]) - typed requests.
//!
//! ```rust,ignore
//! let (actor, client) = ResourceActor::<Order>::new(32);
//! tokio::spawn(actor.run(()));
//!
//! let id = client.create(OrderCreate { user_id: 7, amount: 42.0 }).await?;
//! let pending = client.list(OrderQuery::pending()).await?;
//! ```
//!
//! ## Context Injection
//!
//! Dependencies are passed to [`ResourceActor::run`] rather than `new`, so actors can be
//! created first and wired afterwards.
//!
//! ## Shutdown
//!
//! The run loop ends when every [`ResourceClient`] clone is dropped.
//!
//! ## Testing
//!
//! [`mock::MockClient`] answers requests from scripted expectations, which is how store
//! failures are injected into the code that consumes a store.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;

pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};
