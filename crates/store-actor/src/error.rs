//! # Store Errors
//!
//! Errors raised by the store plumbing itself. Record-specific failures travel boxed in
//! [`FrameworkError::EntityError`] so callers can downcast to the record's own error type.

/// Errors that can occur within the store actor or its client.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
}

impl FrameworkError {
    /// Returns the record error if this wraps one of type `E`.
    pub fn entity_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::EntityError(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// True when the store could not be reached at all; the request may be retried.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ActorClosed | Self::ActorDropped)
    }
}
