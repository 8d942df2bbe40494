//! Plain data types. [`Order`] and [`Dish`] implement
//! [`ActorEntity`](store_actor::ActorEntity) in their actor modules.

pub mod dish;
pub mod order;

pub use dish::*;
pub use order::*;
