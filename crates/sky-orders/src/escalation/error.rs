//! Error types for the escalation pipeline.

use super::transport::TransportError;
use crate::order_actor::OrderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EscalationError {
    /// The payload could not be read as an escalation token.
    #[error("Malformed escalation message: {0}")]
    MalformedMessage(String),

    #[error("Stage {stage} is outside the {len}-stage schedule")]
    StageOutOfRange { stage: usize, len: usize },

    /// Reading or writing the order failed; the delivery should be retried.
    #[error("Order store error: {0}")]
    Store(#[from] OrderError),

    /// A stage could not be handed to the transport. For a delivery, it should be retried.
    #[error("Escalation publish failed: {0}")]
    Publish(#[from] TransportError),
}

impl EscalationError {
    /// Errors that no amount of redelivery will fix.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedMessage(_) | Self::StageOutOfRange { .. }
        )
    }
}
