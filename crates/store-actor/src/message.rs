//! # Store Messages
//!
//! Requests sent from a `ResourceClient` to its `ResourceActor`, each carrying a oneshot
//! channel for the reply.

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Message sent to the actor to request an operation.
///
/// The variants map to CRUD plus two extensions:
///
/// - **List**: returns every record for which [`ActorEntity::matches`] holds, ordered by id
///   of insertion.
/// - **Action**: executes a custom [`ActorEntity::Action`] atomically with respect to every
///   other request.
#[derive(Debug)]
pub enum ResourceRequest<T: ActorEntity> {
    Create {
        params: T::Create,
        respond_to: Response<T::Id>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Update {
        id: T::Id,
        update: T::Update,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
    List {
        query: T::Query,
        respond_to: Response<Vec<T>>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}
