//! Payment-success notifications.
//!
//! A paid order puts a small JSON notice on the pay-success queue; the relay forwards each
//! payload verbatim to every connected client. No state, no retries.

use crate::model::OrderId;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

/// Notice kind understood by the merchant dashboard.
pub const NOTICE_ORDER_PAID: u8 = 1;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaySuccessNotice {
    #[serde(rename = "type")]
    pub kind: u8,
    pub order_id: OrderId,
    pub content: String,
}

impl PaySuccessNotice {
    pub fn paid(order_id: OrderId) -> Self {
        Self {
            kind: NOTICE_ORDER_PAID,
            order_id,
            content: format!("Order number: {}", order_id.0),
        }
    }
}

#[async_trait]
pub trait PushSink: Send + Sync {
    /// Sends `payload` to every connected client. Returns how many received it.
    async fn send_to_all(&self, payload: &str) -> usize;
}

/// Fan-out to in-process subscribers, one per connected client.
#[derive(Debug, Clone)]
pub struct BroadcastPush {
    sender: broadcast::Sender<String>,
}

impl BroadcastPush {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Connects a client.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    pub fn connected(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl PushSink for BroadcastPush {
    async fn send_to_all(&self, payload: &str) -> usize {
        match self.sender.send(payload.to_string()) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No connected clients");
                0
            }
        }
    }
}

pub struct PaySuccessRelay<P> {
    sink: P,
}

impl<P: PushSink> PaySuccessRelay<P> {
    pub fn new(sink: P) -> Self {
        Self { sink }
    }

    /// Forwards every queued payload until the queue's senders are gone.
    pub async fn run(self, mut queue: mpsc::Receiver<String>) {
        info!("Pay-success relay started");
        while let Some(payload) = queue.recv().await {
            let delivered = self.sink.send_to_all(&payload).await;
            debug!(delivered, "Pay-success notice forwarded");
        }
        info!("Pay-success relay stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_wire_form() {
        let notice = serde_json::to_value(PaySuccessNotice::paid(OrderId(31))).unwrap();
        assert_eq!(
            notice,
            serde_json::json!({ "type": 1, "orderId": 31, "content": "Order number: 31" })
        );
    }

    #[tokio::test]
    async fn test_relay_forwards_verbatim() {
        let push = BroadcastPush::new(8);
        let mut client_a = push.subscribe();
        let mut client_b = push.subscribe();
        assert_eq!(push.connected(), 2);

        let (tx, rx) = mpsc::channel(4);
        let relay = tokio::spawn(PaySuccessRelay::new(push.clone()).run(rx));
        tx.send("{\"opaque\":true}".to_string()).await.unwrap();
        drop(tx);
        relay.await.unwrap();

        assert_eq!(client_a.recv().await.unwrap(), "{\"opaque\":true}");
        assert_eq!(client_b.recv().await.unwrap(), "{\"opaque\":true}");
    }

    #[tokio::test]
    async fn test_send_without_clients() {
        let push = BroadcastPush::new(8);
        assert_eq!(push.send_to_all("ignored").await, 0);
    }
}
