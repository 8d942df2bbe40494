//! Conditional status transitions for the Order actor.
//!
//! Each action checks the current status and writes the new one inside a single actor turn,
//! so it behaves as a compare-and-set: it either applies against `PendingPayment` or reports
//! the status it found instead.

use crate::model::{Order, OrderStatus};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Payment arrived. Applies only to an order still awaiting payment.
    MarkPaid { at: DateTime<Utc> },
    /// Cancel an unpaid order, recording when and why.
    CancelIfPending { reason: String, at: DateTime<Utc> },
}

/// Result of a conditional transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The transition was written; carries the updated record.
    Applied(Order),
    /// The order had already left `PendingPayment`; nothing was written.
    Stale { current: OrderStatus },
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
