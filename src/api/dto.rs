use crate::metrics::MetricsSnapshot;
use crate::model::{OrderId, OrderStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: u64,
    pub total_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOrderResponse {
    pub id: OrderId,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub stats: MetricsSnapshot,
}
