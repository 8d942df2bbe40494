//! Delayed delivery: publish with a TTL, receive once it expires.
//!
//! [`EscalationTransport`] is the publishing side the consumer depends on. [`DelayQueue`] is
//! the in-process broker behind it. A published message sits out its TTL, then is
//! dead-lettered onto the processing channel as a [`Delivery`]. The receiver settles each
//! delivery:
//!
//! - `ack` removes the message.
//! - `nack` (or dropping the delivery unsettled) schedules a redelivery after
//!   `redelivery_delay`.
//! - `reject` parks the message in the holding area, as does running out of redeliveries.
//!
//! Parked messages are kept for inspection through [`DelayQueue::parked`]; nothing is
//! dropped without a record.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("Delay queue is closed")]
    Closed,

    #[error("Publish rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait EscalationTransport: Send + Sync {
    /// Returns once the message is accepted; it is delivered after `ttl` elapses.
    async fn publish(&self, payload: String, ttl: Duration) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: EscalationTransport + ?Sized> EscalationTransport for Arc<T> {
    async fn publish(&self, payload: String, ttl: Duration) -> Result<(), TransportError> {
        (**self).publish(payload, ttl).await
    }
}

/// How a delivery was settled by its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Ack,
    Nack,
    Reject,
}

/// One expired message handed to the processing side.
#[derive(Debug)]
pub struct Delivery {
    payload: String,
    attempt: u32,
    settle: Option<oneshot::Sender<Settlement>>,
}

impl Delivery {
    /// Builds a delivery and the receiver its settlement arrives on.
    pub fn new(payload: String, attempt: u32) -> (Self, oneshot::Receiver<Settlement>) {
        let (tx, rx) = oneshot::channel();
        let delivery = Self {
            payload,
            attempt,
            settle: Some(tx),
        };
        (delivery, rx)
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// 1 for the first delivery, incremented on every redelivery.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn ack(self) {
        self.settle(Settlement::Ack);
    }

    pub fn nack(self) {
        self.settle(Settlement::Nack);
    }

    pub fn reject(self) {
        self.settle(Settlement::Reject);
    }

    fn settle(mut self, settlement: Settlement) {
        if let Some(tx) = self.settle.take() {
            let _ = tx.send(settlement);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkReason {
    /// The receiver rejected the message.
    Rejected,
    /// The message was redelivered `max_redeliveries` times without an ack.
    RedeliveriesExhausted,
    /// The processing channel was gone when the message came due on an open queue.
    Undeliverable,
}

/// A message in the holding area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkedMessage {
    pub payload: String,
    pub attempts: u32,
    pub reason: ParkReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayQueueSettings {
    pub redelivery_delay: Duration,
    pub max_redeliveries: u32,
    pub capacity: usize,
}

impl Default for DelayQueueSettings {
    fn default() -> Self {
        Self {
            redelivery_delay: Duration::from_secs(1),
            max_redeliveries: 10,
            capacity: 32,
        }
    }
}

struct Inner {
    dead_letter: mpsc::Sender<Delivery>,
    settings: DelayQueueSettings,
    parked: Mutex<Vec<ParkedMessage>>,
    pending: AtomicUsize,
    closed: watch::Sender<bool>,
}

/// Handle to the in-process broker. Clones share the same queue.
#[derive(Clone)]
pub struct DelayQueue {
    inner: Arc<Inner>,
}

impl DelayQueue {
    /// Creates the queue and the processing channel its expired messages arrive on.
    pub fn new(settings: DelayQueueSettings) -> (Self, mpsc::Receiver<Delivery>) {
        let (dead_letter, deliveries) = mpsc::channel(settings.capacity.max(1));
        let (closed, _) = watch::channel(false);
        let inner = Inner {
            dead_letter,
            settings,
            parked: Mutex::new(Vec::new()),
            pending: AtomicUsize::new(0),
            closed,
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            deliveries,
        )
    }

    /// Messages accepted and not yet acked or parked.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    pub async fn parked(&self) -> Vec<ParkedMessage> {
        self.inner.parked.lock().await.clone()
    }

    /// Stops accepting publishes. Messages still waiting out a delay, or due but not yet
    /// handed over, are abandoned.
    pub fn close(&self) {
        self.inner.closed.send_replace(true);
        info!(pending = self.pending(), "Delay queue closed");
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }
}

#[async_trait]
impl EscalationTransport for DelayQueue {
    async fn publish(&self, payload: String, ttl: Duration) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        debug!(?ttl, "Message accepted");
        tokio::spawn(hold_and_deliver(self.inner.clone(), payload, ttl));
        Ok(())
    }
}

/// Lifetime of one published message, from TTL expiry through every redelivery.
async fn hold_and_deliver(inner: Arc<Inner>, payload: String, ttl: Duration) {
    let mut closed = inner.closed.subscribe();
    let mut delay = ttl;
    let mut attempt = 0;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = closed.wait_for(|closed| *closed) => {
                debug!(attempt, "Queue closed, abandoning delayed message");
                break;
            }
        }

        attempt += 1;
        let (delivery, settled) = Delivery::new(payload.clone(), attempt);
        let sent = tokio::select! {
            sent = inner.dead_letter.send(delivery) => sent.is_ok(),
            _ = closed.wait_for(|closed| *closed) => false,
        };
        if !sent {
            if *closed.borrow() {
                debug!(attempt, "Queue closed, abandoning due message");
            } else {
                warn!(attempt, "Processing channel closed, parking message");
                inner.park(&payload, attempt, ParkReason::Undeliverable).await;
            }
            break;
        }

        match settled.await {
            Ok(Settlement::Ack) => break,
            Ok(Settlement::Reject) => {
                inner.park(&payload, attempt, ParkReason::Rejected).await;
                break;
            }
            Ok(Settlement::Nack) | Err(_) => {
                if attempt > inner.settings.max_redeliveries {
                    warn!(attempt, "Redeliveries exhausted, parking message");
                    inner
                        .park(&payload, attempt, ParkReason::RedeliveriesExhausted)
                        .await;
                    break;
                }
                debug!(attempt, "Delivery not acknowledged, will redeliver");
                delay = inner.settings.redelivery_delay;
            }
        }
    }

    inner.pending.fetch_sub(1, Ordering::SeqCst);
}

impl Inner {
    async fn park(&self, payload: &str, attempts: u32, reason: ParkReason) {
        warn!(payload, attempts, ?reason, "Message parked");
        self.parked.lock().await.push(ParkedMessage {
            payload: payload.to_string(),
            attempts,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(max_redeliveries: u32) -> DelayQueueSettings {
        DelayQueueSettings {
            redelivery_delay: Duration::from_millis(100),
            max_redeliveries,
            capacity: 8,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_waits_for_ttl() {
        let (queue, mut deliveries) = DelayQueue::new(settings(3));
        let start = tokio::time::Instant::now();
        queue
            .publish("hello".into(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(queue.pending(), 1);

        let delivery = deliveries.recv().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(delivery.payload(), "hello");
        assert_eq!(delivery.attempt(), 1);
        delivery.ack();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(queue.pending(), 0);
        assert!(queue.parked().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nack_and_drop_redeliver() {
        let (queue, mut deliveries) = DelayQueue::new(settings(3));
        queue.publish("m".into(), Duration::from_secs(1)).await.unwrap();

        deliveries.recv().await.unwrap().nack();
        let second = deliveries.recv().await.unwrap();
        assert_eq!(second.attempt(), 2);
        drop(second);
        let third = deliveries.recv().await.unwrap();
        assert_eq!(third.attempt(), 3);
        third.ack();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reject_parks_message() {
        let (queue, mut deliveries) = DelayQueue::new(settings(3));
        queue.publish("bad".into(), Duration::from_secs(1)).await.unwrap();
        deliveries.recv().await.unwrap().reject();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(
            queue.parked().await,
            vec![ParkedMessage {
                payload: "bad".into(),
                attempts: 1,
                reason: ParkReason::Rejected,
            }]
        );
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_redeliveries_park_message() {
        let (queue, mut deliveries) = DelayQueue::new(settings(2));
        queue.publish("flaky".into(), Duration::from_secs(1)).await.unwrap();
        for _ in 0..3 {
            deliveries.recv().await.unwrap().nack();
        }

        tokio::time::sleep(Duration::from_millis(1)).await;
        let parked = queue.parked().await;
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].attempts, 3);
        assert_eq!(parked[0].reason, ParkReason::RedeliveriesExhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_queue_refuses_publish() {
        let (queue, _deliveries) = DelayQueue::new(settings(1));
        queue.publish("late".into(), Duration::from_secs(60)).await.unwrap();
        queue.close();

        let err = queue
            .publish("x".into(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Closed);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_abandons_due_messages_instead_of_parking() {
        let settings = DelayQueueSettings {
            capacity: 1,
            ..settings(3)
        };
        let (queue, deliveries) = DelayQueue::new(settings);
        queue.publish("a".into(), Duration::from_secs(1)).await.unwrap();
        queue.publish("b".into(), Duration::from_secs(1)).await.unwrap();

        // One message fills the channel, the other is blocked handing over.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(queue.pending(), 2);

        queue.close();
        drop(deliveries);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(queue.pending(), 0);
        assert!(queue.parked().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_queue_parks_undeliverable_message() {
        let (queue, deliveries) = DelayQueue::new(settings(3));
        queue.publish("orphan".into(), Duration::from_secs(1)).await.unwrap();
        drop(deliveries);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let parked = queue.parked().await;
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].reason, ParkReason::Undeliverable);
        assert_eq!(queue.pending(), 0);
    }
}
