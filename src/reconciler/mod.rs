//! # Inventory Reconciler
//!
//! Admission never touches stock. The reconciler listens on `order.created`, reserves one
//! unit per order in the catalog and settles the order:
//!
//! ```text
//! order.created ──▶ ProductClient::reserve(product, order, 1)
//!                     ├─ ok ────────────────▶ status = confirmed ──▶ order.qty_confirmed
//!                     ├─ no stock / missing ─▶ status = failed ─────▶ order.qty_failed
//!                     └─ catalog unreachable ─▶ order stays pending (logged)
//! ```
//!
//! Reservations are keyed by order id, so a redelivered `order.created` settles the
//! order the same way twice without taking stock twice.

use crate::broker::{EventPublisher, PublishError, Subscription};
use crate::clients::{OrderStore, ProductClient};
use crate::model::{OrderCreated, OrderEvent, OrderStatus, QtyConfirmed, QtyFailed};
use crate::order_actor::StoreError;
use crate::product_actor::ProductError;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Units reserved per order.
const UNITS_PER_ORDER: i64 = 1;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("catalog unavailable: {0}")]
    Catalog(ProductError),

    #[error("failed to settle order: {0}")]
    Store(#[from] StoreError),

    #[error("failed to publish outcome: {0}")]
    Publish(#[from] PublishError),
}

pub struct InventoryReconciler {
    products: ProductClient,
    store: Arc<dyn OrderStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl InventoryReconciler {
    pub fn new(
        products: ProductClient,
        store: Arc<dyn OrderStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            products,
            store,
            publisher,
        }
    }

    /// Settles one created order and returns the outcome event that was published.
    #[instrument(
        skip(self, created),
        fields(order_id = created.order_id.0, product_id = created.product_id.0)
    )]
    pub async fn reconcile(&self, created: &OrderCreated) -> Result<OrderEvent, ReconcileError> {
        let outcome = match self
            .products
            .reserve(created.product_id, created.order_id, UNITS_PER_ORDER)
            .await
        {
            Ok((remaining, already_applied)) => {
                if already_applied {
                    debug!("Reservation already applied");
                }
                self.store.set_status(created.order_id, OrderStatus::Confirmed).await?;
                OrderEvent::QtyConfirmed(QtyConfirmed {
                    order_id: created.order_id,
                    product_id: created.product_id,
                    remaining_qty: remaining,
                })
            }
            Err(
                e @ (ProductError::NotFound(_)
                | ProductError::InsufficientStock { .. }
                | ProductError::InvalidQuantity(_)),
            ) => {
                self.store.set_status(created.order_id, OrderStatus::Failed).await?;
                OrderEvent::QtyFailed(QtyFailed {
                    order_id: created.order_id,
                    product_id: created.product_id,
                    reason: e.to_string(),
                })
            }
            Err(e) => return Err(ReconcileError::Catalog(e)),
        };

        self.publisher.publish(outcome.topic(), &outcome).await?;
        info!(topic = outcome.topic(), "Order settled");
        Ok(outcome)
    }

    /// Consumes `subscription` until it ends or `shutdown` fires.
    pub async fn run(self, mut subscription: Subscription, shutdown: CancellationToken) {
        info!(topic = subscription.topic(), "Reconciler started");
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = subscription.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                OrderEvent::OrderCreated(created) => {
                    if let Err(e) = self.reconcile(&created).await {
                        warn!(order_id = created.order_id.0, error = %e, "Order left pending");
                    }
                }
                other => debug!(topic = other.topic(), "Ignoring event"),
            }
        }
        info!("Reconciler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::model::{
        Order, OrderId, Product, ProductCreate, ProductId, ORDER_QTY_CONFIRMED, ORDER_QTY_FAILED,
    };
    use crate::product_actor::ProductActionResult;
    use resource_actor::mock::MockClient;
    use resource_actor::FrameworkError;

    fn created(order: u64, product: u64) -> OrderCreated {
        let mut order_row = Order::pending(ProductId(product), 1500);
        order_row.id = OrderId(order);
        OrderCreated::from(&order_row)
    }

    fn reserved(remaining: i64) -> ProductActionResult {
        ProductActionResult::Reserved {
            remaining,
            already_applied: false,
        }
    }

    #[tokio::test]
    async fn test_reserved_order_is_confirmed() {
        let mut products = MockClient::<Product>::new();
        products.expect_action(ProductId(1)).return_ok(reserved(4));
        let mut orders = MockClient::<Order>::new();
        orders.expect_action(OrderId(7)).return_ok(OrderStatus::Confirmed);

        let broker = InMemoryBroker::new();
        let mut confirmations = broker.subscribe(ORDER_QTY_CONFIRMED);
        let reconciler = InventoryReconciler::new(
            ProductClient::new(products.client()),
            Arc::new(crate::clients::OrderClient::new(orders.client())),
            Arc::new(broker),
        );

        let outcome = reconciler.reconcile(&created(7, 1)).await.unwrap();
        assert!(matches!(outcome, OrderEvent::QtyConfirmed(QtyConfirmed { remaining_qty: 4, .. })));
        assert_eq!(confirmations.recv().await, Some(outcome));
        products.verify();
        orders.verify();
    }

    #[tokio::test]
    async fn test_out_of_stock_order_is_failed() {
        let mut products = MockClient::<Product>::new();
        products
            .expect_action(ProductId(1))
            .return_err(FrameworkError::EntityError(Box::new(ProductError::InsufficientStock {
                requested: 1,
                available: 0,
            })));
        let mut orders = MockClient::<Order>::new();
        orders.expect_action(OrderId(7)).return_ok(OrderStatus::Failed);

        let broker = InMemoryBroker::new();
        let mut failures = broker.subscribe(ORDER_QTY_FAILED);
        let reconciler = InventoryReconciler::new(
            ProductClient::new(products.client()),
            Arc::new(crate::clients::OrderClient::new(orders.client())),
            Arc::new(broker),
        );

        let outcome = reconciler.reconcile(&created(7, 1)).await.unwrap();
        assert_eq!(outcome.order_id(), OrderId(7));
        assert!(matches!(failures.recv().await, Some(OrderEvent::QtyFailed(_))));
        orders.verify();
    }

    #[tokio::test]
    async fn test_unreachable_catalog_leaves_order_pending() {
        let mut products = MockClient::<Product>::new();
        products.expect_action(ProductId(1)).return_err(FrameworkError::ActorClosed);
        let orders = MockClient::<Order>::new();

        let reconciler = InventoryReconciler::new(
            ProductClient::new(products.client()),
            Arc::new(crate::clients::OrderClient::new(orders.client())),
            Arc::new(InMemoryBroker::new()),
        );

        let err = reconciler.reconcile(&created(7, 1)).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Catalog(_)));
        orders.verify();
    }

    #[tokio::test]
    async fn test_redelivery_does_not_take_stock_twice() {
        let (product_actor, products) = crate::product_actor::new(10);
        tokio::spawn(product_actor.run(()));
        let (order_actor, orders) = crate::order_actor::new(10);
        tokio::spawn(order_actor.run(()));

        let product = products
            .create_product(ProductCreate {
                name: "Widget".into(),
                price: 1000,
                qty: 3,
            })
            .await
            .unwrap();
        let order = orders.insert(Order::pending(product.id, 1000)).await.unwrap();

        let reconciler = InventoryReconciler::new(
            products.clone(),
            Arc::new(orders),
            Arc::new(InMemoryBroker::new()),
        );
        let event = OrderCreated::from(&order);
        reconciler.reconcile(&event).await.unwrap();
        reconciler.reconcile(&event).await.unwrap();

        let stock = products.check_stock(product.id).await.unwrap();
        assert_eq!(stock, 2);
    }
}
