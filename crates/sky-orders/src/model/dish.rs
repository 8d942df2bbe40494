//! Dish catalog records and the view items served from the cache.
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DishId(pub u64);

impl From<u32> for DishId {
    fn from(id: u32) -> Self {
        Self(u64::from(id))
    }
}

impl Display for DishId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dish_{}", self.0)
    }
}

/// Catalog category a dish is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub u64);

impl Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a dish is on sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DishStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishFlavor {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dish {
    pub id: DishId,
    pub category_id: CategoryId,
    pub name: String,
    pub price: f64,
    pub status: DishStatus,
    pub flavors: Vec<DishFlavor>,
}

/// Payload for creating a new dish. New dishes start disabled.
#[derive(Debug, Clone)]
pub struct DishCreate {
    pub category_id: CategoryId,
    pub name: String,
    pub price: f64,
    pub flavors: Vec<DishFlavor>,
}

#[derive(Debug, Clone, Default)]
pub struct DishUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub flavors: Option<Vec<DishFlavor>>,
}

#[derive(Debug, Clone)]
pub struct DishQuery {
    pub category_id: CategoryId,
    pub status: Option<DishStatus>,
}

/// One entry of a cached category listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishView {
    pub id: DishId,
    pub category_id: CategoryId,
    pub name: String,
    pub price: f64,
    pub flavors: Vec<DishFlavor>,
}

impl From<Dish> for DishView {
    fn from(dish: Dish) -> Self {
        Self {
            id: dish.id,
            category_id: dish.category_id,
            name: dish.name,
            price: dish.price,
            flavors: dish.flavors,
        }
    }
}
