//! Error types for the Order actor.

use crate::model::{OrderId, OrderStatus};
use store_actor::FrameworkError;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// The requested order was not found.
    #[error("Order not found: {0}")]
    NotFound(String),

    /// The order data provided is invalid.
    #[error("Order validation error: {0}")]
    ValidationError(String),

    /// A whole-record update tried to move the status backwards or out of a terminal state.
    #[error("Illegal status transition for {id}: {from} -> {to}")]
    IllegalTransition {
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for OrderError {
    fn from(e: FrameworkError) -> Self {
        if let Some(inner) = e.entity_error::<OrderError>() {
            return inner.clone();
        }
        match e {
            FrameworkError::NotFound(id) => OrderError::NotFound(id),
            other => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}
