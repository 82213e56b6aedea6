//! # HTTP surface
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | POST | `/orders` | `201 {"id", "status"}` |
//! | GET | `/orders/{id}` | `200 Order` |
//! | GET | `/orders/product/{productId}` | `200 [Order]`, newest first |
//! | GET | `/health` | `200 {"status": "healthy", "stats": {...}}` |
//!
//! Failures are `{"error": CODE, "message": ...}`; see [`ApiError`] for the status table.

pub mod dto;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::admission::OrderAdmission;
use axum::http::{header, HeaderValue};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<OrderAdmission>,
}

pub fn router(admission: Arc<OrderAdmission>) -> Router {
    Router::new()
        .route("/orders", post(handlers::create_order))
        .route("/orders/{id}", get(handlers::get_order))
        .route("/orders/product/{product_id}", get(handlers::get_orders_by_product))
        .route("/health", get(handlers::health))
        .layer(middleware::map_response(security_headers))
        .with_state(AppState { admission })
}

async fn security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::cache::{CacheSettings, ProductCache};
    use crate::config::AdmissionConfig;
    use crate::metrics::{AtomicMetrics, MetricsCollector};
    use crate::model::ProductCreate;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn app() -> Router {
        let (product_actor, products) = crate::product_actor::new(16);
        tokio::spawn(product_actor.run(()));
        let (order_actor, orders) = crate::order_actor::new(16);
        tokio::spawn(order_actor.run(()));

        products
            .create_product(ProductCreate {
                name: "Widget".into(),
                price: 1000,
                qty: 5,
            })
            .await
            .unwrap();

        let metrics: Arc<dyn MetricsCollector> = Arc::new(AtomicMetrics::new());
        let cache = ProductCache::new(
            Arc::new(products),
            None,
            CacheSettings::default(),
            metrics.clone(),
        );
        let config = AdmissionConfig {
            db_workers: 4,
            event_workers: 4,
            ..AdmissionConfig::default()
        };
        let admission = OrderAdmission::new(
            &config,
            Arc::new(cache),
            Arc::new(orders),
            Arc::new(InMemoryBroker::new()),
            metrics,
        );
        router(Arc::new(admission))
    }

    fn post_order(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/orders")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_read_order() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(post_order(r#"{"productId": 1, "totalPrice": 1500}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        let created = json(response).await;
        assert_eq!(created["status"], "pending");
        let id = created["id"].as_u64().unwrap();

        let response = app.clone().oneshot(get(&format!("/orders/{id}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let order = json(response).await;
        assert_eq!(order["productId"], 1);
        assert_eq!(order["totalPrice"], 1500);

        let response = app.oneshot(get("/orders/product/1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_unknown_product_is_404() {
        let app = app().await;
        let response = app
            .oneshot(post_order(r#"{"productId": 99, "totalPrice": 1500}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["error"], "PRODUCT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let app = app().await;
        let response = app.oneshot(post_order(r#"{"productId": "one"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_negative_price_is_400() {
        let app = app().await;
        let response = app
            .oneshot(post_order(r#"{"productId": 1, "totalPrice": -5}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_product_without_orders_is_404() {
        let app = app().await;
        let response = app.oneshot(get("/orders/product/1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_stats() {
        let app = app().await;
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["stats"]["total_requests"], 0);
    }
}
