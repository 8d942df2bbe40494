//! # Escalating Delayed Cancellation
//!
//! Unpaid orders are cancelled after a fixed sequence of delays, driven entirely by delayed
//! delivery on the transport rather than by timers or polling inside the service.
//!
//! ```text
//! place_order ── publish(stage 0, ttl[0]) ──▶ DelayQueue ── after ttl ──▶ EscalationConsumer
//!                                                ▲                              │
//!                                                └── publish(stage k+1, ttl[k+1]) ┤ still unpaid, k+1 < N
//!                                                                               │
//!                                                  cancel_if_pending(order) ◀───┘ k = N-1
//! ```
//!
//! ## Structure
//!
//! - [`token`] - [`EscalationToken`] and its JSON wire form
//! - [`schedule`] - [`StageSchedule`]
//! - [`store`] - [`OrderStore`], the order view the consumer reads and writes
//! - [`transport`] - [`EscalationTransport`], [`Delivery`], and the in-process [`DelayQueue`]
//! - [`consumer`] - [`EscalationConsumer`]
//! - [`error`] - [`EscalationError`]

pub mod consumer;
pub mod error;
pub mod schedule;
pub mod store;
pub mod token;
pub mod transport;

pub use consumer::*;
pub use error::*;
pub use schedule::*;
pub use store::*;
pub use token::*;
pub use transport::*;
