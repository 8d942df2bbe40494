//! Type-safe wrappers around [`ResourceClient`](store_actor::ResourceClient).

pub mod dish_client;
pub mod order_client;

pub use dish_client::*;
pub use order_client::*;
