//! Customer orders and their payment lifecycle.
//!
//! # Actor Framework
//! [`Order`] implements [`ActorEntity`](store_actor::ActorEntity) (see
//! [`crate::order_actor`]), so the order store is a
//! [`ResourceActor`](store_actor::ResourceActor).
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for Orders. Serialises as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl From<u32> for OrderId {
    fn from(id: u32) -> Self {
        Self(u64::from(id))
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

/// Where an order stands.
///
/// Transitions only move forward. `Cancelled` and `Completed` are terminal; a paid order
/// never returns to `PendingPayment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Confirmed,
    Delivering,
    Completed,
    Cancelled,
}

impl OrderStatus {
    fn rank(self) -> u8 {
        match self {
            Self::PendingPayment => 0,
            Self::Paid => 1,
            Self::Confirmed => 2,
            Self::Delivering => 3,
            Self::Completed => 4,
            Self::Cancelled => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a record in `self` may be rewritten with status `next`.
    ///
    /// Staying put is always allowed so that other fields can be updated.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            // merchant rejection of a paid order is still a cancellation
            Self::Cancelled => true,
            _ => next.rank() > self.rank(),
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Paid => "PAID",
            Self::Confirmed => "CONFIRMED",
            Self::Delivering => "DELIVERING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: u64,
    pub amount: f64,
    pub status: OrderStatus,
    pub order_time: DateTime<Utc>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub cancel_time: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
}

impl Order {
    /// Creates a new order awaiting payment.
    pub fn new(id: OrderId, user_id: u64, amount: f64) -> Self {
        Self {
            id,
            user_id,
            amount,
            status: OrderStatus::PendingPayment,
            order_time: Utc::now(),
            checkout_time: None,
            cancel_time: None,
            cancel_reason: None,
        }
    }

    pub fn is_pending_payment(&self) -> bool {
        self.status == OrderStatus::PendingPayment
    }
}

/// Payload for creating a new order.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub user_id: u64,
    pub amount: f64,
}

/// Filter for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub user_id: Option<u64>,
}

impl OrderQuery {
    /// The "awaiting payment" set.
    pub fn pending() -> Self {
        Self {
            status: Some(OrderStatus::PendingPayment),
            user_id: None,
        }
    }
}
