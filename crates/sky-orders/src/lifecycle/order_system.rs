use crate::cache::{CacheError, InMemoryCache};
use crate::catalog::DishCatalog;
use crate::clients::{DishClient, OrderClient};
use crate::config::PipelineConfig;
use crate::dish_actor::DishError;
use crate::escalation::{DelayQueue, EscalationConsumer, EscalationError, OrderStore};
use crate::model::{Dish, DishId, DishStatus, DishUpdate, Order, OrderCreate, OrderId};
use crate::notify::{BroadcastPush, PaySuccessNotice, PaySuccessRelay};
use crate::order_actor::{OrderError, TransitionOutcome};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

pub type Catalog = DishCatalog<DishClient, Arc<InMemoryCache>>;
type Consumer = EscalationConsumer<OrderClient, DelayQueue>;

/// Cancel reason for an order whose payment timeout could not be scheduled.
pub const UNSCHEDULED_CANCEL_REASON: &str = "payment timeout could not be scheduled";

#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Escalation(#[from] EscalationError),

    #[error(transparent)]
    Dish(#[from] DishError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Pay-success notification failed: {0}")]
    Notify(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),
}

/// The running order backend.
///
/// Owns the Order and Dish actors, the delay queue and its escalation consumer, the
/// pay-success relay, and (when configured) the catalog sweeper.
///
/// # Example
///
/// ```ignore
/// let system = OrderSystem::new(PipelineConfig::from_env()?);
///
/// let id = system.place_order(OrderCreate { user_id: 7, amount: 42.0 }).await?;
/// system.pay_order(id).await?;
/// let dishes = system.catalog.list_with_flavor(CategoryId(3)).await?;
///
/// system.shutdown().await?;
/// ```
pub struct OrderSystem {
    pub order_client: OrderClient,
    pub dish_client: DishClient,
    /// Cached "dishes of a category" reads.
    pub catalog: Arc<Catalog>,
    /// Connected dashboard clients subscribe here for pay-success notices.
    pub push: BroadcastPush,

    queue: DelayQueue,
    consumer: Arc<Consumer>,
    pay_success: mpsc::Sender<String>,
    shutdown: watch::Sender<bool>,

    /// Escalation consumer and catalog sweeper; stopped through `shutdown`.
    workers: Vec<JoinHandle<()>>,
    /// Actors and the relay; stopped by dropping their senders.
    handles: Vec<JoinHandle<()>>,
}

impl OrderSystem {
    /// Spawns every actor and worker. Must be called inside a Tokio runtime.
    pub fn new(config: PipelineConfig) -> Self {
        let capacity = config.channel_capacity;
        let (shutdown, shutdown_rx) = watch::channel(false);

        // 1. Actors
        let (order_actor, order_client) = crate::order_actor::new(capacity);
        let (dish_actor, dish_client) = crate::dish_actor::new(capacity);
        let mut handles = vec![
            tokio::spawn(order_actor.run(())),
            tokio::spawn(dish_actor.run(())),
        ];

        // 2. Escalation pipeline
        let (queue, deliveries) = DelayQueue::new(config.delay_queue());
        let consumer = Arc::new(
            EscalationConsumer::new(order_client.clone(), queue.clone(), config.schedule.clone())
                .with_cancel_reason(config.cancel_reason.clone()),
        );
        let mut workers = vec![tokio::spawn(
            Arc::clone(&consumer).run(deliveries, shutdown_rx.clone()),
        )];

        // 3. Catalog cache
        let catalog = Arc::new(
            DishCatalog::new(
                dish_client.clone(),
                Arc::new(InMemoryCache::new()),
                config.dish_cache_ttl,
            )
            .with_lock_timeout(config.cache_lock_timeout),
        );
        if let Some(every) = config.lock_sweep_interval {
            workers.push(tokio::spawn(sweep_catalog(
                Arc::clone(&catalog),
                every,
                shutdown_rx,
            )));
        }

        // 4. Pay-success relay
        let push = BroadcastPush::new(capacity);
        let (pay_success, pay_queue) = mpsc::channel(capacity.max(1));
        handles.push(tokio::spawn(PaySuccessRelay::new(push.clone()).run(pay_queue)));

        info!(
            stages = config.schedule.len(),
            total = ?config.schedule.total(),
            "Order system started"
        );

        Self {
            order_client,
            dish_client,
            catalog,
            push,
            queue,
            consumer,
            pay_success,
            shutdown,
            workers,
            handles,
        }
    }

    /// Creates a pending order and starts its payment-timeout escalation.
    ///
    /// If the escalation cannot be started the order is cancelled again, so no order is
    /// left awaiting payment without a timeout behind it.
    #[instrument(skip(self))]
    pub async fn place_order(&self, params: OrderCreate) -> Result<OrderId, SystemError> {
        let id = self.order_client.create_order(params).await?;
        if let Err(e) = self.consumer.start(id).await {
            error!(order_id = %id, error = %e, "Escalation not started, withdrawing order");
            if let Err(undo) = self
                .order_client
                .cancel_if_pending(id, UNSCHEDULED_CANCEL_REASON, Utc::now())
                .await
            {
                error!(order_id = %id, error = %undo, "Order left pending without escalation");
            }
            return Err(e.into());
        }
        Ok(id)
    }

    /// Records a payment and notifies connected clients.
    ///
    /// A payment for an order that already left `PendingPayment` changes nothing and sends
    /// no notice.
    #[instrument(skip(self))]
    pub async fn pay_order(&self, id: OrderId) -> Result<TransitionOutcome, SystemError> {
        let outcome = self.order_client.mark_paid(id).await?;
        match &outcome {
            TransitionOutcome::Applied(_) => {
                let notice = serde_json::to_string(&PaySuccessNotice::paid(id))
                    .map_err(|e| SystemError::Notify(e.to_string()))?;
                self.pay_success
                    .send(notice)
                    .await
                    .map_err(|_| SystemError::Notify("pay-success queue closed".into()))?;
                info!("Order paid");
            }
            TransitionOutcome::Stale { current } => {
                warn!(status = %current, "Payment for an order no longer awaiting payment");
            }
        }
        Ok(outcome)
    }

    /// The "awaiting payment" set.
    pub async fn pending_orders(&self) -> Result<Vec<Order>, OrderError> {
        self.order_client.list_pending().await
    }

    pub fn delay_queue(&self) -> &DelayQueue {
        &self.queue
    }

    /// Edits a dish and evicts its category listing.
    #[instrument(skip(self, update))]
    pub async fn update_dish(&self, id: DishId, update: DishUpdate) -> Result<Dish, SystemError> {
        let dish = self.dish_client.update_dish(id, update).await?;
        self.catalog.evict_category(dish.category_id).await?;
        Ok(dish)
    }

    /// Puts a dish on sale or takes it off, and evicts its category listing.
    #[instrument(skip(self))]
    pub async fn set_dish_status(
        &self,
        id: DishId,
        status: DishStatus,
    ) -> Result<Dish, SystemError> {
        let dish = self.dish_client.set_status(id, status).await?;
        self.catalog.evict_category(dish.category_id).await?;
        Ok(dish)
    }

    /// Closes the delay queue, then stops the workers, then the actors.
    ///
    /// Escalations still waiting out a delay are abandoned, as are deliveries that come
    /// due after the queue closes. Deliveries already being processed finish first.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        self.queue.close();
        self.shutdown.send_replace(true);
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("Worker task failed: {:?}", e);
                return Err(SystemError::TaskFailed(e.to_string()));
            }
        }

        drop(self.consumer);
        drop(self.catalog);
        drop(self.pay_success);
        drop(self.order_client);
        drop(self.dish_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(SystemError::TaskFailed(e.to_string()));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

/// Periodically drops idle per-key locks and expired cache entries.
async fn sweep_catalog(
    catalog: Arc<Catalog>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = async { shutdown.wait_for(|stop| *stop).await.map(|_| ()) } => break,
            _ = ticker.tick() => {
                let locks = catalog.sweep_locks();
                let entries = catalog.loader().cache().purge_expired().await;
                debug!(locks, entries, "Catalog swept");
            }
        }
    }
}
