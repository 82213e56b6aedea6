//! Domain events and their single wire codec.
//!
//! Every event travels as `{"pattern": <topic>, "data": {...}}`; the pattern doubles as
//! the routing topic, so one enum covers both the payload types and the topic table.

use crate::model::{Order, OrderId, ProductId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ORDER_CREATED: &str = "order.created";
pub const ORDER_QTY_CONFIRMED: &str = "order.qty_confirmed";
pub const ORDER_QTY_FAILED: &str = "order.qty_failed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderCreated {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            product_id: order.product_id,
            total_price: order.total_price,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QtyConfirmed {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub remaining_qty: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QtyFailed {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", content = "data")]
pub enum OrderEvent {
    #[serde(rename = "order.created")]
    OrderCreated(OrderCreated),
    #[serde(rename = "order.qty_confirmed")]
    QtyConfirmed(QtyConfirmed),
    #[serde(rename = "order.qty_failed")]
    QtyFailed(QtyFailed),
}

impl OrderEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => ORDER_CREATED,
            OrderEvent::QtyConfirmed(_) => ORDER_QTY_CONFIRMED,
            OrderEvent::QtyFailed(_) => ORDER_QTY_FAILED,
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderCreated(e) => e.order_id,
            OrderEvent::QtyConfirmed(e) => e.order_id,
            OrderEvent::QtyFailed(e) => e.order_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn encode(event: &OrderEvent) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(event)?)
}

pub fn decode(bytes: &[u8]) -> Result<OrderEvent, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}
