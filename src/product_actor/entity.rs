//! ActorEntity trait implementation for the Product domain type.
//!
//! Includes support for custom actions like stock checking and reservation.
//!
//! See the trait implementation on [`Product`] for method documentation.

use super::actions::{ProductAction, ProductActionResult};
use super::error::ProductError;
use crate::model::{Product, ProductCreate, ProductId};
use async_trait::async_trait;
use resource_actor::ActorEntity;

/// Marker constant to ensure module documentation is rendered.
#[doc(hidden)]
pub const ENTITY_IMPL_PRESENT: bool = true;

#[async_trait]
impl ActorEntity for Product {
    type Id = ProductId;
    type Create = ProductCreate;
    /// Every product matches; the catalog has no secondary indexes.
    type Query = ();
    type Action = ProductAction;
    type ActionResult = ProductActionResult;
    type Context = ();
    type Error = ProductError;

    /// Creates a new Product from creation parameters.
    fn from_create_params(id: ProductId, params: ProductCreate) -> Result<Self, ProductError> {
        if params.qty < 0 {
            return Err(ProductError::InvalidQuantity(params.qty));
        }
        Ok(Self::new(id, params.name, params.price, params.qty))
    }

    fn matches(&self, _query: &()) -> bool {
        true
    }

    /// Handles custom actions for the Product entity.
    ///
    /// # Actions
    /// - `CheckStock`: Returns the current quantity
    /// - `Reserve`: Decrements stock once per order, fails if not enough is left
    async fn handle_action(
        &mut self,
        action: ProductAction,
        _ctx: &(),
    ) -> Result<ProductActionResult, ProductError> {
        match action {
            ProductAction::CheckStock => Ok(ProductActionResult::CheckStock(self.qty)),
            ProductAction::Reserve { order_id, qty } => {
                if qty <= 0 {
                    return Err(ProductError::InvalidQuantity(qty));
                }
                if self.reserved_for.contains(&order_id) {
                    return Ok(ProductActionResult::Reserved {
                        remaining: self.qty,
                        already_applied: true,
                    });
                }
                if self.qty < qty {
                    return Err(ProductError::InsufficientStock {
                        requested: qty,
                        available: self.qty,
                    });
                }
                self.qty -= qty;
                self.reserved_for.insert(order_id);
                Ok(ProductActionResult::Reserved {
                    remaining: self.qty,
                    already_applied: false,
                })
            }
        }
    }
}
