//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
//!
//! ```bash
//! RUST_LOG=info cargo run -p sky-orders      # escalations, cancellations, cache evictions
//! RUST_LOG=debug cargo run -p sky-orders     # every delivery, cache hit and actor request
//! RUST_LOG=sky_orders::escalation=debug,info cargo run -p sky-orders
//! ```
//!
//! A stage-by-stage cancellation reads like this at `info`:
//!
//! ```text
//! INFO place_order: Order created order_id=order_2
//! INFO handle{order_id=order_2 stage=0}: Order still unpaid, escalated next_stage=1 ttl=15s
//! ...
//! INFO handle{order_id=order_2 stage=4}: Order cancelled after payment timeout reason=payment timeout, auto-cancelled
//! ```

/// Initialises the global subscriber. Call once, at process start.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
