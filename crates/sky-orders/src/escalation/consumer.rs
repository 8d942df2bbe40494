//! The escalation state machine, run once per expired delivery.
//!
//! Every delivery re-reads the order, so duplicates and redeliveries are harmless: an order
//! that left `PendingPayment` short-circuits every later stage. Intermediate stages only
//! publish the next token. The last stage re-reads the order and cancels it through the
//! store's conditional update.

use super::error::EscalationError;
use super::schedule::StageSchedule;
use super::store::OrderStore;
use super::token::EscalationToken;
use super::transport::{Delivery, EscalationTransport};
use crate::model::{Order, OrderId, OrderStatus};
use crate::order_actor::{OrderError, TransitionOutcome};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_CANCEL_REASON: &str = "payment timeout, auto-cancelled";

/// What a single delivery did.
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationOutcome {
    /// The order does not exist.
    OrderMissing,
    /// The order had already left `PendingPayment` at the first read.
    AlreadyResolved(OrderStatus),
    /// Still unpaid; the next stage was published.
    Escalated {
        next: EscalationToken,
        ttl: Duration,
    },
    /// Final stage; the order was cancelled.
    Cancelled(Order),
    /// Final stage; the order changed status after the first read.
    LostRace(OrderStatus),
}

pub struct EscalationConsumer<S, T> {
    store: S,
    transport: T,
    schedule: StageSchedule,
    cancel_reason: String,
}

impl<S: OrderStore, T: EscalationTransport> EscalationConsumer<S, T> {
    pub fn new(store: S, transport: T, schedule: StageSchedule) -> Self {
        Self {
            store,
            transport,
            schedule,
            cancel_reason: DEFAULT_CANCEL_REASON.to_string(),
        }
    }

    pub fn with_cancel_reason(mut self, reason: impl Into<String>) -> Self {
        self.cancel_reason = reason.into();
        self
    }

    pub fn schedule(&self) -> &StageSchedule {
        &self.schedule
    }

    /// Publishes the stage-0 token for a freshly created order.
    #[instrument(skip(self))]
    pub async fn start(&self, order_id: OrderId) -> Result<Duration, EscalationError> {
        let token = EscalationToken::first(order_id);
        let ttl = self.ttl_for(token.stage)?;
        self.transport.publish(token.encode(), ttl).await?;
        debug!(?ttl, "Escalation started");
        Ok(ttl)
    }

    #[instrument(skip(self, token), fields(order_id = %token.order_id, stage = token.stage))]
    pub async fn handle(
        &self,
        token: EscalationToken,
    ) -> Result<EscalationOutcome, EscalationError> {
        self.ttl_for(token.stage)?;

        let Some(order) = self.store.get_by_id(token.order_id).await? else {
            info!("Order no longer exists, dropping");
            return Ok(EscalationOutcome::OrderMissing);
        };
        if !order.is_pending_payment() {
            debug!(status = %order.status, "Order already resolved, dropping");
            return Ok(EscalationOutcome::AlreadyResolved(order.status));
        }

        if !self.schedule.is_last(token.stage) {
            let next = token.next();
            let ttl = self.ttl_for(next.stage)?;
            self.transport.publish(next.encode(), ttl).await?;
            info!(next_stage = next.stage, ?ttl, "Order still unpaid, escalated");
            return Ok(EscalationOutcome::Escalated { next, ttl });
        }

        self.cancel(token.order_id).await
    }

    pub async fn handle_payload(
        &self,
        payload: &str,
    ) -> Result<EscalationOutcome, EscalationError> {
        let token = EscalationToken::decode(payload)?;
        self.handle(token).await
    }

    /// Final stage: re-read, then cancel only if still unpaid.
    async fn cancel(&self, order_id: OrderId) -> Result<EscalationOutcome, EscalationError> {
        let Some(order) = self.store.get_by_id(order_id).await? else {
            info!("Order disappeared before cancellation, dropping");
            return Ok(EscalationOutcome::OrderMissing);
        };
        if !order.is_pending_payment() {
            info!(status = %order.status, "Order resolved before final check");
            return Ok(EscalationOutcome::LostRace(order.status));
        }

        match self
            .store
            .cancel_if_pending(order_id, &self.cancel_reason, Utc::now())
            .await
        {
            Ok(TransitionOutcome::Applied(order)) => {
                info!(reason = %self.cancel_reason, "Order cancelled after payment timeout");
                Ok(EscalationOutcome::Cancelled(order))
            }
            Ok(TransitionOutcome::Stale { current }) => {
                info!(status = %current, "Order resolved while cancelling");
                Ok(EscalationOutcome::LostRace(current))
            }
            Err(OrderError::NotFound(_)) => {
                info!("Order disappeared while cancelling, dropping");
                Ok(EscalationOutcome::OrderMissing)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn ttl_for(&self, stage: usize) -> Result<Duration, EscalationError> {
        self.schedule
            .ttl(stage)
            .ok_or(EscalationError::StageOutOfRange {
                stage,
                len: self.schedule.len(),
            })
    }

    /// Settles one delivery: ack on success, reject if it can never succeed, nack otherwise.
    pub async fn process(&self, delivery: Delivery) {
        match self.handle_payload(delivery.payload()).await {
            Ok(outcome) => {
                debug!(?outcome, "Delivery handled");
                delivery.ack();
            }
            Err(e) if e.is_malformed() => {
                warn!(payload = delivery.payload(), error = %e, "Rejecting escalation message");
                delivery.reject();
            }
            Err(e) => {
                warn!(attempt = delivery.attempt(), error = %e, "Escalation failed, requeueing");
                delivery.nack();
            }
        }
    }
}

impl<S, T> EscalationConsumer<S, T>
where
    S: OrderStore + 'static,
    T: EscalationTransport + 'static,
{
    /// Processes deliveries concurrently until `shutdown` turns true or the channel closes,
    /// then waits for deliveries already in progress.
    pub async fn run(
        self: Arc<Self>,
        mut deliveries: mpsc::Receiver<Delivery>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Escalation consumer started");
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => break,
                delivery = deliveries.recv() => {
                    let Some(delivery) = delivery else { break };
                    let consumer = Arc::clone(&self);
                    in_flight.spawn(async move { consumer.process(delivery).await });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Delivery task failed");
                    }
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Delivery task failed");
            }
        }
        info!("Escalation consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::TransportError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(String, Duration)>>);

    #[async_trait]
    impl EscalationTransport for Recording {
        async fn publish(&self, payload: String, ttl: Duration) -> Result<(), TransportError> {
            self.0.lock().await.push((payload, ttl));
            Ok(())
        }
    }

    struct Single(Mutex<Option<Order>>);

    #[async_trait]
    impl OrderStore for Single {
        async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
            Ok(self.0.lock().await.clone().filter(|o| o.id == id))
        }

        async fn update(&self, order: Order) -> Result<Order, OrderError> {
            *self.0.lock().await = Some(order.clone());
            Ok(order)
        }
    }

    fn consumer(order: Option<Order>) -> EscalationConsumer<Single, Recording> {
        EscalationConsumer::new(
            Single(Mutex::new(order)),
            Recording::default(),
            StageSchedule::from_millis(&[10, 20, 30]).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_start_reports_publish_failure() {
        struct Closed;

        #[async_trait]
        impl EscalationTransport for Closed {
            async fn publish(
                &self,
                _payload: String,
                _ttl: Duration,
            ) -> Result<(), TransportError> {
                Err(TransportError::Closed)
            }
        }

        let consumer = EscalationConsumer::new(
            Single(Mutex::new(None)),
            Closed,
            StageSchedule::from_millis(&[10]).unwrap(),
        );
        let err = consumer.start(OrderId(4)).await.unwrap_err();
        assert_eq!(err.to_string(), "Escalation publish failed: Delay queue is closed");
        assert!(!err.is_malformed());
    }

    #[tokio::test]
    async fn test_start_publishes_stage_zero() {
        let consumer = consumer(None);
        let ttl = consumer.start(OrderId(4)).await.unwrap();
        assert_eq!(ttl, Duration::from_millis(10));

        let published = consumer.transport.0.lock().await;
        assert_eq!(published.len(), 1);
        let token = EscalationToken::decode(&published[0].0).unwrap();
        assert_eq!(token, EscalationToken::first(OrderId(4)));
    }

    #[tokio::test]
    async fn test_intermediate_stage_only_publishes() {
        let order = Order::new(OrderId(1), 1, 10.0);
        let consumer = consumer(Some(order.clone()));

        let outcome = consumer
            .handle(EscalationToken { order_id: OrderId(1), stage: 1 })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            EscalationOutcome::Escalated {
                next: EscalationToken { order_id: OrderId(1), stage: 2 },
                ttl: Duration::from_millis(30),
            }
        );
        assert_eq!(consumer.store.0.lock().await.clone(), Some(order));
    }

    #[tokio::test]
    async fn test_final_stage_cancels_with_reason() {
        let consumer =
            consumer(Some(Order::new(OrderId(1), 1, 10.0))).with_cancel_reason("timeout");

        let outcome = consumer
            .handle(EscalationToken { order_id: OrderId(1), stage: 2 })
            .await
            .unwrap();
        let EscalationOutcome::Cancelled(order) = outcome else {
            panic!("expected cancellation, got {outcome:?}");
        };
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.cancel_reason.as_deref(), Some("timeout"));
        assert!(order.cancel_time.is_some());
        assert!(consumer.transport.0.lock().await.is_empty());
    }

    /// Serves the order for the first `visible` reads, then reports it gone.
    struct Vanishing {
        order: Order,
        visible: usize,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl OrderStore for Vanishing {
        async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
            let read = self.reads.fetch_add(1, Ordering::SeqCst);
            Ok((read < self.visible && self.order.id == id).then(|| self.order.clone()))
        }

        async fn update(&self, order: Order) -> Result<Order, OrderError> {
            Err(OrderError::NotFound(order.id.to_string()))
        }
    }

    #[tokio::test]
    async fn test_order_deleted_during_final_cancel_is_dropped() {
        let store = Vanishing {
            order: Order::new(OrderId(6), 1, 10.0),
            visible: 2,
            reads: AtomicUsize::new(0),
        };
        let consumer = EscalationConsumer::new(
            store,
            Recording::default(),
            StageSchedule::from_millis(&[10, 20, 30]).unwrap(),
        );

        let (delivery, settled) =
            Delivery::new(EscalationToken { order_id: OrderId(6), stage: 2 }.encode(), 1);
        consumer.process(delivery).await;

        assert_eq!(settled.await.unwrap(), crate::escalation::Settlement::Ack);
        assert_eq!(consumer.store.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stage_past_schedule_is_malformed() {
        let consumer = consumer(Some(Order::new(OrderId(1), 1, 10.0)));
        let err = consumer
            .handle(EscalationToken { order_id: OrderId(1), stage: 3 })
            .await
            .unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn test_process_settles_deliveries() {
        use crate::escalation::Settlement;

        let consumer = consumer(None);

        let (delivery, settled) = Delivery::new("{oops".into(), 1);
        consumer.process(delivery).await;
        assert_eq!(settled.await.unwrap(), Settlement::Reject);

        let (delivery, settled) = Delivery::new(EscalationToken::first(OrderId(8)).encode(), 1);
        consumer.process(delivery).await;
        assert_eq!(settled.await.unwrap(), Settlement::Ack);
    }
}
