//! Custom actions for the Product actor.
//!
//! This module defines the stock operations that can be performed on a
//! [`Product`](crate::model::Product) in the in-process catalog. They are handled by
//! [`ActorEntity::handle_action`](resource_actor::ActorEntity::handle_action).
//!
//! See [`impl ActorEntity for Product`](crate::model::Product#impl-ActorEntity-for-Product)
//! for the implementation details.

use crate::model::OrderId;

/// Custom actions for Product entities.
#[derive(Debug, Clone)]
pub enum ProductAction {
    /// Reads the current stock level without modifying it.
    CheckStock,
    /// Draws `qty` units of stock on behalf of `order_id`.
    ///
    /// # Errors
    /// Fails if the requested amount exceeds available stock. Applying the same
    /// order twice is a no-op success.
    Reserve { order_id: OrderId, qty: i64 },
}

/// Results from ProductActions - variants match 1:1 with ProductAction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductActionResult {
    /// Result from CheckStock action - returns the current stock level
    CheckStock(i64),
    /// Result from Reserve action
    Reserved {
        remaining: i64,
        /// True when this order had already been reserved and nothing changed.
        already_applied: bool,
    },
}
