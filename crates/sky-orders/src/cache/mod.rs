//! # Read-Through Cache
//!
//! A shared TTL cache ([`DistributedCache`]) fronted by a [`SingleFlightLoader`] that makes
//! sure a burst of misses on one key costs one backing query.

pub mod distributed;
pub mod error;
pub mod loader;
pub mod lock_registry;

pub use distributed::*;
pub use error::*;
pub use loader::*;
pub use lock_registry::*;
