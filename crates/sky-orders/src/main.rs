//! # Sky Orders demo
//!
//! Runs the order backend with a shortened stage schedule (override with
//! `SKY_STAGE_SCHEDULE_MS`) and walks through:
//!
//! 1. an order that is paid before its escalation finishes;
//! 2. an order that is never paid and gets cancelled by the final stage;
//! 3. a cached catalog read, served once from the store and then from the cache.

use sky_orders::config::{PipelineConfig, ENV_STAGE_SCHEDULE_MS};
use sky_orders::lifecycle::{setup_tracing, OrderSystem};
use sky_orders::model::{CategoryId, DishCreate, DishFlavor, DishStatus, OrderCreate};
use std::time::Duration;
use tracing::{error, info, Instrument};

const DEMO_SCHEDULE_MS: &str = "200,300,400,500,600";

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = PipelineConfig::from_env_with(|key| {
        std::env::var(key)
            .ok()
            .or_else(|| (key == ENV_STAGE_SCHEDULE_MS).then(|| DEMO_SCHEDULE_MS.to_string()))
    })
    .map_err(|e| e.to_string())?;
    let total = config.schedule.total();

    info!(schedule = ?config.schedule.iter().collect::<Vec<_>>(), "Starting order system");
    let system = OrderSystem::new(config);
    let mut dashboard = system.push.subscribe();

    // Paid order
    let span = tracing::info_span!("paid_order");
    async {
        let id = system
            .place_order(OrderCreate { user_id: 1, amount: 58.0 })
            .await
            .map_err(|e| e.to_string())?;
        system.pay_order(id).await.map_err(|e| e.to_string())?;
        match dashboard.recv().await {
            Ok(notice) => info!(%notice, "Dashboard notified"),
            Err(e) => error!(error = %e, "Dashboard missed the notice"),
        }
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    // Abandoned order
    let abandoned = system
        .place_order(OrderCreate { user_id: 2, amount: 23.5 })
        .instrument(tracing::info_span!("abandoned_order"))
        .await
        .map_err(|e| e.to_string())?;
    info!(order_id = %abandoned, wait = ?total, "Waiting for the escalation to run out");
    tokio::time::sleep(total + Duration::from_millis(500)).await;

    let pending = system.pending_orders().await.map_err(|e| e.to_string())?;
    info!(pending = pending.len(), "Orders still awaiting payment");

    // Catalog
    let span = tracing::info_span!("catalog");
    async {
        let dish = system
            .dish_client
            .create_dish(DishCreate {
                category_id: CategoryId(1),
                name: "Boiled fish".to_string(),
                price: 48.0,
                flavors: vec![DishFlavor {
                    name: "spice".to_string(),
                    value: "[\"mild\",\"hot\"]".to_string(),
                }],
            })
            .await
            .map_err(|e| e.to_string())?;
        system
            .set_dish_status(dish, DishStatus::Enabled)
            .await
            .map_err(|e| e.to_string())?;

        for _ in 0..2 {
            let dishes = system
                .catalog
                .list_with_flavor(CategoryId(1))
                .await
                .map_err(|e| e.to_string())?;
            info!(count = dishes.len(), "Category listed");
        }
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    let parked = system.delay_queue().parked().await;
    if !parked.is_empty() {
        error!(count = parked.len(), "Escalation messages parked");
    }

    system.shutdown().await.map_err(|e| e.to_string())?;
    info!("Application completed successfully");
    Ok(())
}
