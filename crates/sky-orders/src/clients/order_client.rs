//! # Order Client
//!
//! High-level API over `ResourceClient<Order>`. It is the concrete
//! [`OrderStore`](crate::escalation::OrderStore) consumed by the escalation pipeline.
use crate::escalation::OrderStore;
use crate::model::{Order, OrderCreate, OrderId, OrderQuery};
use crate::order_actor::{OrderAction, OrderError, TransitionOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use store_actor::{ActorClient, FrameworkError, ResourceClient};
use tracing::{debug, info, instrument};

/// Client for interacting with the Order actor.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self))]
    pub async fn create_order(&self, params: OrderCreate) -> Result<OrderId, OrderError> {
        debug!("Sending create_order to actor");
        let id = self.inner.create(params).await?;
        info!(order_id = %id, "Order created");
        Ok(id)
    }

    /// Records a payment. Only an order still awaiting payment is changed.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, id: OrderId) -> Result<TransitionOutcome, OrderError> {
        debug!("Sending request");
        let outcome = self
            .inner
            .perform_action(id, OrderAction::MarkPaid { at: Utc::now() })
            .await?;
        Ok(outcome)
    }

    /// Orders still awaiting payment, oldest first.
    #[instrument(skip(self))]
    pub async fn list_pending(&self) -> Result<Vec<Order>, OrderError> {
        self.list(OrderQuery::pending()).await
    }
}

#[async_trait]
impl ActorClient<Order> for OrderClient {
    type Error = OrderError;

    fn inner(&self) -> &ResourceClient<Order> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        OrderError::from(e)
    }
}

#[async_trait]
impl OrderStore for OrderClient {
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.inner.get(id).await?)
    }

    async fn update(&self, order: Order) -> Result<Order, OrderError> {
        Ok(self.inner.update(order.id, order).await?)
    }

    /// Atomic inside the actor: status check and write happen in one turn.
    async fn cancel_if_pending(
        &self,
        id: OrderId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, OrderError> {
        let action = OrderAction::CancelIfPending {
            reason: reason.to_string(),
            at,
        };
        Ok(self.inner.perform_action(id, action).await?)
    }
}
