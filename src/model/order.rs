/// Represents a customer order.
///
/// # Actor Framework
/// This struct implements the [`ActorEntity`](resource_actor::ActorEntity) trait,
/// allowing it to be stored by a [`ResourceActor`](resource_actor::ResourceActor).
///
/// See [`impl ActorEntity for Order`](#impl-ActorEntity-for-Order) for details on:
/// - Insert payload (an unpersisted [`Order`] built by [`Order::pending`])
/// - Status transitions ([`OrderAction`](crate::order_actor::OrderAction))
use crate::model::ProductId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for Orders. `OrderId(0)` means "not assigned yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl OrderId {
    pub const UNASSIGNED: OrderId = OrderId(0);

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

/// Lifecycle of an order.
///
/// `pending` is set at admission; only the inventory reconciliation path moves an
/// order to `confirmed` or `failed`, and neither of those ever goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Failed,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Confirmed | OrderStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Failed => "failed",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    pub total_price: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds a new, unpersisted order in `pending` status stamped with the current time.
    pub fn pending(product_id: ProductId, total_price: i64) -> Self {
        Self {
            id: OrderId::UNASSIGNED,
            product_id,
            total_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_machine_only_leaves_pending() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Confirmed));
    }

    #[test]
    fn test_order_json_uses_camel_case() {
        let order = Order::pending(ProductId(3), 1500);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["id"], 0);
        assert_eq!(json["productId"], 3);
        assert_eq!(json["totalPrice"], 1500);
        assert_eq!(json["status"], "pending");
        assert!(json["createdAt"].is_string());
    }
}
