/// Catalog-side product records and the read-only projection the admission path caches.
///
/// # Actor Framework
/// [`Product`] implements the [`ActorEntity`](resource_actor::ActorEntity) trait so the
/// in-process catalog can run on a [`ResourceActor`](resource_actor::ResourceActor).
/// See [`ProductAction`](crate::product_actor::ProductAction) for stock operations.
use crate::model::OrderId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;

/// Type-safe identifier for Products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "product_{}", self.0)
    }
}

/// Snapshot of a catalog product as served by the product service.
///
/// `qty == 0` is a valid out-of-stock product, not an absent one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: ProductId,
    pub name: String,
    pub price: i64,
    pub qty: i64,
}

impl ProductInfo {
    pub fn in_stock(&self) -> bool {
        self.qty > 0
    }
}

/// A product as owned by the catalog, including which orders already drew stock.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: i64,
    pub qty: i64,
    /// Orders whose reservation has been applied; makes reservation idempotent.
    pub reserved_for: HashSet<OrderId>,
}

impl Product {
    /// Creates a new Product instance.
    ///
    /// # Arguments
    /// * `id` - Unique identifier (typically set by the actor system)
    /// * `name` - Product name
    /// * `price` - Unit price in minor currency units
    /// * `qty` - Available stock quantity
    pub fn new(id: ProductId, name: impl Into<String>, price: i64, qty: i64) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            qty,
            reserved_for: HashSet::new(),
        }
    }

    pub fn info(&self) -> ProductInfo {
        ProductInfo {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            qty: self.qty,
        }
    }
}

/// Payload for creating a catalog product.
#[derive(Debug, Clone)]
pub struct ProductCreate {
    pub name: String,
    pub price: i64,
    pub qty: i64,
}
