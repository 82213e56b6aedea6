//! ActorEntity trait implementation for the Order domain type.
//!
//! This module contains the [`ActorEntity`] trait implementation
//! that enables [`Order`] to be stored by the generic [`resource_actor::ResourceActor`].
//!
//! The insert payload is the pending [`Order`] itself; the actor fills in the id.
//! Status changes are the only mutation and go through [`OrderAction`].

use super::error::OrderError;
use crate::model::{Order, OrderId, OrderStatus, ProductId};
use async_trait::async_trait;
use resource_actor::ActorEntity;

/// Marker constant to ensure module documentation is rendered.
#[doc(hidden)]
pub const ENTITY_IMPL_PRESENT: bool = true;

/// Filters accepted by `Find` requests against the order actor.
#[derive(Debug, Clone)]
pub enum OrderQuery {
    ByProduct(ProductId),
}

/// Status transitions applied by the reconciliation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Confirm,
    Fail,
}

impl OrderAction {
    pub fn target(self) -> OrderStatus {
        match self {
            OrderAction::Confirm => OrderStatus::Confirmed,
            OrderAction::Fail => OrderStatus::Failed,
        }
    }
}

#[async_trait]
impl ActorEntity for Order {
    type Id = OrderId;
    type Create = Order;
    type Query = OrderQuery;
    type Action = OrderAction;
    type ActionResult = OrderStatus;
    type Context = ();
    type Error = OrderError;

    /// Stores the pending order under the id chosen by the actor.
    fn from_create_params(id: OrderId, mut params: Order) -> Result<Self, OrderError> {
        if params.total_price < 0 {
            return Err(OrderError::ValidationError(format!(
                "total price must be non-negative, got {}",
                params.total_price
            )));
        }
        if params.status != OrderStatus::Pending {
            return Err(OrderError::ValidationError(format!(
                "new orders must be pending, got {}",
                params.status
            )));
        }
        params.id = id;
        Ok(params)
    }

    fn matches(&self, query: &OrderQuery) -> bool {
        match query {
            OrderQuery::ByProduct(product_id) => self.product_id == *product_id,
        }
    }

    /// Moves the order out of `pending`. Repeating the transition that already
    /// happened succeeds, so redelivered events are harmless.
    async fn handle_action(
        &mut self,
        action: OrderAction,
        _ctx: &(),
    ) -> Result<OrderStatus, OrderError> {
        let next = action.target();
        if self.status == next {
            return Ok(next);
        }
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(next)
    }
}
