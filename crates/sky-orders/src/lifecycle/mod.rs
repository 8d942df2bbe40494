//! # System Lifecycle & Orchestration
//!
//! Starts, wires and stops the order backend.
//!
//! ## Startup
//!
//! [`OrderSystem::new`] spawns, in order:
//!
//! 1. the Order and Dish actors (no context, so no construction-time dependencies);
//! 2. the [`DelayQueue`](crate::escalation::DelayQueue) and the
//!    [`EscalationConsumer`](crate::escalation::EscalationConsumer) draining it, which holds
//!    an `OrderClient` clone as its order store and a queue clone to publish the next stage;
//! 3. the [`DishCatalog`](crate::catalog::DishCatalog) over an in-memory cache, plus the
//!    sweeper (idle locks and expired entries) when `lock_sweep_interval` is set;
//! 4. the pay-success relay feeding [`BroadcastPush`](crate::notify::BroadcastPush).
//!
//! ## Shutdown
//!
//! The consumer publishes back into the queue that feeds it, so that part of the graph is
//! cyclic and cannot be stopped by dropping senders alone. [`OrderSystem::shutdown`]:
//!
//! 1. closes the delay queue, abandoning messages still waiting out a delay or coming due
//!    from here on;
//! 2. flips the shutdown watch, stopping the consumer (after its in-flight deliveries) and
//!    the sweeper;
//! 3. drops every client and the pay-success sender, so the actors and relay see their
//!    channels close;
//! 4. awaits every task.
//!
//! ## Observability
//!
//! [`setup_tracing`] configures the subscriber; see [`self::tracing`] for log levels and sample output.

pub mod order_system;
pub mod tracing;

pub use order_system::*;
pub use self::tracing::*;
