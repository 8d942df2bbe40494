//! # Sky Orders
//!
//! Order backend core: payment-timeout cancellation driven by delayed delivery, and a
//! single-flight read-through cache in front of the dish catalog.
//!
//! - [`model`] - orders, dishes and the cached dish view
//! - [`order_actor`] / [`dish_actor`] - the record stores, built on `store-actor`
//! - [`clients`] - typed clients for both stores
//! - [`escalation`] - tokens, stage schedule, delay queue and the escalation consumer
//! - [`cache`] / [`catalog`] - single-flight cache and the category listing it serves
//! - [`notify`] - pay-success pass-through to connected clients
//! - [`config`] - environment configuration
//! - [`lifecycle`] - [`OrderSystem`](lifecycle::OrderSystem) wiring and tracing setup

pub mod cache;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod dish_actor;
pub mod escalation;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod order_actor;
