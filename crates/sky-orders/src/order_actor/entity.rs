//! [`ActorEntity`] implementation for [`Order`].

use super::actions::{OrderAction, TransitionOutcome};
use super::error::OrderError;
use crate::model::{Order, OrderCreate, OrderId, OrderQuery, OrderStatus};
use async_trait::async_trait;
use store_actor::ActorEntity;

#[async_trait]
impl ActorEntity for Order {
    type Id = OrderId;
    type Create = OrderCreate;
    /// Whole-record replacement.
    type Update = Order;
    type Query = OrderQuery;
    type Action = OrderAction;
    type ActionResult = TransitionOutcome;
    type Context = ();
    type Error = OrderError;

    fn from_create_params(id: OrderId, params: OrderCreate) -> Result<Self, Self::Error> {
        if !params.amount.is_finite() || params.amount < 0.0 {
            return Err(OrderError::ValidationError(format!(
                "amount must be a non-negative number, got {}",
                params.amount
            )));
        }
        Ok(Order::new(id, params.user_id, params.amount))
    }

    fn matches(&self, query: &OrderQuery) -> bool {
        query.status.map_or(true, |status| status == self.status)
            && query.user_id.map_or(true, |user_id| user_id == self.user_id)
    }

    /// Replaces the stored record, refusing id changes and non-monotonic status moves.
    async fn on_update(&mut self, update: Order, _ctx: &Self::Context) -> Result<(), Self::Error> {
        if update.id != self.id {
            return Err(OrderError::ValidationError(format!(
                "record id {} does not match {}",
                update.id, self.id
            )));
        }
        if !self.status.can_transition_to(update.status) {
            return Err(OrderError::IllegalTransition {
                id: self.id,
                from: self.status,
                to: update.status,
            });
        }
        *self = update;
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: OrderAction,
        _ctx: &Self::Context,
    ) -> Result<TransitionOutcome, Self::Error> {
        if !self.is_pending_payment() {
            return Ok(TransitionOutcome::Stale {
                current: self.status,
            });
        }
        match action {
            OrderAction::MarkPaid { at } => {
                self.status = OrderStatus::Paid;
                self.checkout_time = Some(at);
            }
            OrderAction::CancelIfPending { reason, at } => {
                self.status = OrderStatus::Cancelled;
                self.cancel_time = Some(at);
                self.cancel_reason = Some(reason);
            }
        }
        Ok(TransitionOutcome::Applied(self.clone()))
    }
}
