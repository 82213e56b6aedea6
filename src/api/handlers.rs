use super::dto::{CreateOrderRequest, CreateOrderResponse, HealthResponse};
use super::error::ApiError;
use super::AppState;
use crate::model::{Order, OrderId, ProductId};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    debug!(?request, "create_order called");

    if request.product_id == 0 {
        return Err(ApiError::bad_request("productId required"));
    }

    let order = state
        .admission
        .create_order(ProductId(request.product_id), request.total_price)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            id: order.id,
            status: order.status,
        }),
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let order = state.admission.get_order(OrderId(id)).await?;
    Ok(Json(order))
}

pub async fn get_orders_by_product(
    State(state): State<AppState>,
    product_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let Path(product_id) = product_id.map_err(|_| ApiError::bad_request("productId required"))?;
    let orders = state.admission.get_orders_by_product(ProductId(product_id)).await?;
    Ok(Json(orders))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        stats: state.admission.metrics(),
    })
}
