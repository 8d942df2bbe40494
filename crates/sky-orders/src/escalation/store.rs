//! The order-status view the escalation consumer relies on.

use crate::model::{Order, OrderId, OrderStatus};
use crate::order_actor::{OrderError, TransitionOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, OrderError>;

    /// Whole-record update.
    async fn update(&self, order: Order) -> Result<Order, OrderError>;

    /// Cancels `id` only if it is still awaiting payment.
    ///
    /// The default body reads and then writes, so a payment landing between the two calls
    /// is overwritten. Stores that can check and write in one step should override it.
    async fn cancel_if_pending(
        &self,
        id: OrderId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, OrderError> {
        let Some(mut order) = self.get_by_id(id).await? else {
            return Err(OrderError::NotFound(id.to_string()));
        };
        if !order.is_pending_payment() {
            return Ok(TransitionOutcome::Stale {
                current: order.status,
            });
        }
        order.status = OrderStatus::Cancelled;
        order.cancel_time = Some(at);
        order.cancel_reason = Some(reason.to_string());
        Ok(TransitionOutcome::Applied(self.update(order).await?))
    }
}

#[async_trait]
impl<S: OrderStore + ?Sized> OrderStore for Arc<S> {
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
        (**self).get_by_id(id).await
    }

    async fn update(&self, order: Order) -> Result<Order, OrderError> {
        (**self).update(order).await
    }

    async fn cancel_if_pending(
        &self,
        id: OrderId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, OrderError> {
        (**self).cancel_if_pending(id, reason, at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// Plain read/update store, so the default `cancel_if_pending` body is exercised.
    struct Table(Mutex<Vec<Order>>);

    #[async_trait]
    impl OrderStore for Table {
        async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
            Ok(self.0.lock().await.iter().find(|o| o.id == id).cloned())
        }

        async fn update(&self, order: Order) -> Result<Order, OrderError> {
            let mut rows = self.0.lock().await;
            let row = rows
                .iter_mut()
                .find(|o| o.id == order.id)
                .ok_or_else(|| OrderError::NotFound(order.id.to_string()))?;
            *row = order.clone();
            Ok(order)
        }
    }

    #[tokio::test]
    async fn test_default_cancel_if_pending() {
        let mut paid = Order::new(OrderId(2), 1, 30.0);
        paid.status = OrderStatus::Paid;
        let table = Table(Mutex::new(vec![Order::new(OrderId(1), 1, 20.0), paid]));

        let outcome = table
            .cancel_if_pending(OrderId(1), "payment timeout", Utc::now())
            .await
            .unwrap();
        let TransitionOutcome::Applied(order) = outcome else {
            panic!("expected the pending order to be cancelled");
        };
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.cancel_reason.as_deref(), Some("payment timeout"));

        let outcome = table
            .cancel_if_pending(OrderId(2), "payment timeout", Utc::now())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::Stale {
                current: OrderStatus::Paid
            }
        );

        let err = table
            .cancel_if_pending(OrderId(3), "payment timeout", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, OrderError::NotFound("order_3".into()));
    }
}
