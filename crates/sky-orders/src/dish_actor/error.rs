//! Error types for the Dish actor.

use store_actor::FrameworkError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DishError {
    #[error("Dish not found: {0}")]
    NotFound(String),

    #[error("Dish validation error: {0}")]
    ValidationError(String),

    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for DishError {
    fn from(e: FrameworkError) -> Self {
        if let Some(inner) = e.entity_error::<DishError>() {
            return inner.clone();
        }
        match e {
            FrameworkError::NotFound(id) => DishError::NotFound(id),
            other => DishError::ActorCommunicationError(other.to_string()),
        }
    }
}
