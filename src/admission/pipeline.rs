use super::{AdmissionError, StockPolicy};
use crate::broker::{EventPublisher, PublishError};
use crate::cache::{CacheError, OrderListingCache, ProductCache};
use crate::clients::OrderStore;
use crate::concurrency::{AdmissionGate, TaskDispatcher, WorkerPool};
use crate::config::AdmissionConfig;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::model::{Order, OrderCreated, OrderEvent, OrderId, ProductId, ORDER_CREATED};
use crate::order_actor::StoreError;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
struct Deadlines {
    admission_wait: Duration,
    validation: Duration,
    db_acquire: Duration,
    persist: Duration,
    publish: Duration,
    get_order: Duration,
    list_orders: Duration,
    slow_request: Duration,
}

/// Validates, persists and announces new orders; serves order reads.
pub struct OrderAdmission {
    cache: Arc<ProductCache>,
    store: Arc<dyn OrderStore>,
    publisher: Arc<dyn EventPublisher>,
    listings: OrderListingCache,
    gate: AdmissionGate,
    db_pool: WorkerPool,
    events: TaskDispatcher,
    metrics: Arc<dyn MetricsCollector>,
    stock_policy: StockPolicy,
    deadlines: Deadlines,
}

impl OrderAdmission {
    /// Builds the pipeline and starts its event dispatcher. Must be called inside a
    /// Tokio runtime.
    pub fn new(
        config: &AdmissionConfig,
        cache: Arc<ProductCache>,
        store: Arc<dyn OrderStore>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<dyn MetricsCollector>,
    ) -> Self {
        Self {
            cache,
            store,
            publisher,
            listings: OrderListingCache::new(config.listing_ttl),
            gate: AdmissionGate::new(config.admission_queue_capacity),
            db_pool: WorkerPool::new("db", config.db_workers),
            events: TaskDispatcher::start(
                "events",
                config.event_workers,
                config.event_queue_capacity,
            ),
            metrics,
            stock_policy: config.stock_policy,
            deadlines: Deadlines {
                admission_wait: config.admission_wait,
                validation: config.validation_timeout,
                db_acquire: config.db_acquire_timeout,
                persist: config.persist_timeout,
                publish: config.publish_timeout,
                get_order: config.get_order_timeout,
                list_orders: config.list_orders_timeout,
                slow_request: config.slow_request_threshold,
            },
        }
    }

    pub fn cache(&self) -> &Arc<ProductCache> {
        &self.cache
    }

    pub async fn create_order(
        &self,
        product_id: ProductId,
        total_price: i64,
    ) -> Result<Order, AdmissionError> {
        self.create_order_with_cancel(product_id, total_price, &CancellationToken::new())
            .await
    }

    #[instrument(name = "create_order", skip(self, cancel), fields(product_id = product_id.0))]
    pub async fn create_order_with_cancel(
        &self,
        product_id: ProductId,
        total_price: i64,
        cancel: &CancellationToken,
    ) -> Result<Order, AdmissionError> {
        let started = Instant::now();
        self.metrics.request_started();

        let result = self.admit(product_id, total_price, cancel).await;

        match &result {
            Ok(order) => {
                self.metrics.request_succeeded();
                let elapsed = started.elapsed();
                if elapsed > self.deadlines.slow_request {
                    warn!(order_id = order.id.0, ?elapsed, "Slow order creation");
                }
                info!(order_id = order.id.0, "Order accepted");
            }
            Err(e) => {
                self.metrics.request_failed();
                warn!(error = %e, "Order rejected");
            }
        }
        result
    }

    async fn admit(
        &self,
        product_id: ProductId,
        total_price: i64,
        cancel: &CancellationToken,
    ) -> Result<Order, AdmissionError> {
        if total_price < 0 {
            return Err(AdmissionError::InvalidRequest(format!(
                "totalPrice must be non-negative, got {total_price}"
            )));
        }

        // 1. Backpressure: held until this request finishes.
        let _ticket = cancellable(cancel, self.gate.enter(self.deadlines.admission_wait))
            .await?
            .map_err(AdmissionError::ServiceOverloaded)?;

        // 2. Product validation under its own deadline.
        let validation = timeout(self.deadlines.validation, self.cache.resolve(product_id));
        let product = match cancellable(cancel, validation).await? {
            Err(_) => return Err(AdmissionError::ValidationTimeout(self.deadlines.validation)),
            Ok(Err(CacheError::Timeout(elapsed))) => {
                return Err(AdmissionError::ValidationTimeout(elapsed))
            }
            Ok(Err(e)) => return Err(AdmissionError::Validation(e)),
            Ok(Ok(None)) => return Err(AdmissionError::ProductNotFound(product_id)),
            Ok(Ok(Some(product))) => product,
        };
        if self.stock_policy == StockPolicy::RejectOutOfStock && !product.in_stock() {
            return Err(AdmissionError::ProductUnavailable(product_id));
        }

        // 3.
        let order = Order::pending(product_id, total_price);

        // 4. Persist on a bounded db slot.
        let slot = cancellable(cancel, self.db_pool.acquire(self.deadlines.db_acquire))
            .await?
            .map_err(AdmissionError::ServiceOverloaded)?;
        let persist = timeout(self.deadlines.persist, self.store.insert(order));
        let inserted = cancellable(cancel, persist).await?;
        drop(slot);
        let stored = match inserted {
            Ok(Ok(stored)) if !stored.id.is_assigned() => {
                return Err(AdmissionError::PersistenceFailure(StoreError::MissingId))
            }
            Ok(Ok(stored)) => stored,
            Ok(Err(e)) => return Err(AdmissionError::PersistenceFailure(e)),
            Err(_) => {
                return Err(AdmissionError::PersistenceFailure(StoreError::Timeout(
                    self.deadlines.persist,
                )))
            }
        };
        self.listings.invalidate(product_id);

        // 5. Announce after the response path; never affects the result.
        self.publish_created(&stored);

        Ok(stored)
    }

    fn publish_created(&self, order: &Order) {
        let event = OrderEvent::OrderCreated(OrderCreated::from(order));
        let publisher = Arc::clone(&self.publisher);
        let metrics = Arc::clone(&self.metrics);
        let deadline = self.deadlines.publish;
        let order_id = order.id;

        let job = async move {
            let published = timeout(deadline, publisher.publish(ORDER_CREATED, &event))
                .await
                .unwrap_or(Err(PublishError::Timeout(deadline)));
            match published {
                Ok(()) => metrics.event_published(),
                Err(e) => {
                    metrics.event_publish_failed();
                    warn!(order_id = order_id.0, error = %e, "Failed to publish event");
                }
            }
        };

        if let Err(e) = self.events.try_submit(job) {
            self.metrics.event_dropped();
            warn!(order_id = order_id.0, error = %e, "Skipping event");
        }
    }

    #[instrument(skip(self), fields(order_id = id.0))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, AdmissionError> {
        match timeout(self.deadlines.get_order, self.store.get_by_id(id)).await {
            Ok(Ok(Some(order))) => Ok(order),
            Ok(Ok(None)) => Err(AdmissionError::OrderNotFound(id.to_string())),
            Ok(Err(e)) => Err(AdmissionError::Store(e)),
            Err(_) => Err(AdmissionError::Store(StoreError::Timeout(self.deadlines.get_order))),
        }
    }

    /// Orders for one product, newest first. No orders at all is `OrderNotFound`.
    #[instrument(skip(self), fields(product_id = product_id.0))]
    pub async fn get_orders_by_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Order>, AdmissionError> {
        if let Some(orders) = self.listings.get(product_id) {
            debug!(key = %OrderListingCache::key(product_id), "Listing cache hit");
            return Ok(orders);
        }

        let generation = self.listings.generation(product_id);
        let listing = timeout(self.deadlines.list_orders, self.store.get_by_product_id(product_id));
        let orders = match listing.await {
            Ok(Ok(orders)) => orders,
            Ok(Err(e)) => return Err(AdmissionError::Store(e)),
            Err(_) => {
                return Err(AdmissionError::Store(StoreError::Timeout(
                    self.deadlines.list_orders,
                )))
            }
        };
        if orders.is_empty() {
            return Err(AdmissionError::OrderNotFound(format!("no orders for {product_id}")));
        }
        self.listings.put(product_id, generation, orders.clone());
        Ok(orders)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot::new(
            self.metrics.counters(),
            self.gate.usage(),
            self.db_pool.usage(),
            self.events.worker_usage(),
            self.events.queue_usage(),
        )
    }

    /// Stops admitting new orders and drains queued event publishes.
    pub async fn shutdown(&self) {
        self.gate.close();
        self.events.shutdown().await;
    }
}

/// Races `work` against `cancel`.
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    work: F,
) -> Result<F::Output, AdmissionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AdmissionError::Cancelled),
        output = work => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSettings;
    use crate::clients::{LookupError, ProductLookup, OrderClient};
    use crate::metrics::AtomicMetrics;
    use crate::model::{ProductInfo, OrderStatus};
    use async_trait::async_trait;
    use resource_actor::mock::{create_mock_client, expect_create, MockClient};
    use resource_actor::FrameworkError;
    use std::sync::Mutex;

    struct FixedOrigin(Vec<ProductInfo>);

    #[async_trait]
    impl ProductLookup for FixedOrigin {
        async fn fetch(
            &self,
            id: ProductId,
            _deadline: Duration,
        ) -> Result<Option<ProductInfo>, LookupError> {
            Ok(self.0.iter().find(|p| p.id == id).cloned())
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<(String, OrderEvent)>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, topic: &str, event: &OrderEvent) -> Result<(), PublishError> {
            if let Ok(mut events) = self.events.lock() {
                events.push((topic.to_string(), event.clone()));
            }
            Ok(())
        }
    }

    fn widget() -> ProductInfo {
        ProductInfo {
            id: ProductId(1),
            name: "Widget".into(),
            price: 1000,
            qty: 5,
        }
    }

    /// Store that acknowledges inserts without assigning an id.
    struct UnassignedStore;

    #[async_trait]
    impl OrderStore for UnassignedStore {
        async fn insert(&self, order: Order) -> Result<Order, StoreError> {
            Ok(order)
        }

        async fn get_by_id(&self, _id: OrderId) -> Result<Option<Order>, StoreError> {
            Ok(None)
        }

        async fn get_by_product_id(&self, _: ProductId) -> Result<Vec<Order>, StoreError> {
            Ok(Vec::new())
        }

        async fn set_status(
            &self,
            _id: OrderId,
            status: OrderStatus,
        ) -> Result<OrderStatus, StoreError> {
            Ok(status)
        }
    }

    fn admission_with(store: OrderClient, publisher: Arc<RecordingPublisher>) -> OrderAdmission {
        admission_over(Arc::new(store), publisher)
    }

    fn admission_over(
        store: Arc<dyn OrderStore>,
        publisher: Arc<RecordingPublisher>,
    ) -> OrderAdmission {
        let config = AdmissionConfig {
            db_workers: 2,
            event_workers: 2,
            ..AdmissionConfig::default()
        };
        let metrics: Arc<dyn MetricsCollector> = Arc::new(AtomicMetrics::new());
        let cache = ProductCache::new(
            Arc::new(FixedOrigin(vec![widget()])),
            None,
            CacheSettings::default(),
            metrics.clone(),
        );
        OrderAdmission::new(&config, Arc::new(cache), store, publisher, metrics)
    }

    fn stored(id: u64) -> Order {
        let mut order = Order::pending(ProductId(1), 1500);
        order.id = OrderId(id);
        order
    }

    #[tokio::test]
    async fn test_store_failure_is_persistence_failure() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_create().return_err(FrameworkError::ActorClosed);
        let admission = admission_with(OrderClient::new(mock.client()), Arc::default());

        let err = admission.create_order(ProductId(1), 1500).await.unwrap_err();
        assert!(matches!(err, AdmissionError::PersistenceFailure(StoreError::Unavailable(_))));
        assert_eq!(admission.metrics().counters.failed_requests, 1);
        mock.verify();
    }

    #[tokio::test]
    async fn test_insert_without_id_is_persistence_failure() {
        let publisher = Arc::new(RecordingPublisher::default());
        let admission = admission_over(Arc::new(UnassignedStore), publisher.clone());

        let err = admission.create_order(ProductId(1), 1500).await.unwrap_err();
        assert_eq!(err, AdmissionError::PersistenceFailure(StoreError::MissingId));

        admission.shutdown().await;
        assert!(publisher.events.lock().unwrap().is_empty());
        assert_eq!(admission.metrics().counters.failed_requests, 1);
    }

    #[tokio::test]
    async fn test_negative_price_is_invalid_and_touches_nothing() {
        let mock = MockClient::<Order>::new();
        let admission = admission_with(OrderClient::new(mock.client()), Arc::default());

        let err = admission.create_order(ProductId(1), -1).await.unwrap_err();
        assert!(matches!(err, AdmissionError::InvalidRequest(_)));
        mock.verify();
    }

    #[tokio::test]
    async fn test_cancelled_request_does_not_persist() {
        let mock = MockClient::<Order>::new();
        let admission = admission_with(OrderClient::new(mock.client()), Arc::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = admission
            .create_order_with_cancel(ProductId(1), 1500, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, AdmissionError::Cancelled);
        mock.verify();
    }

    #[tokio::test]
    async fn test_cancel_while_persisting() {
        let (client, mut requests) = create_mock_client::<Order>(4);
        let admission = Arc::new(admission_with(OrderClient::new(client), Arc::default()));
        let cancel = CancellationToken::new();

        let task = {
            let admission = admission.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                admission
                    .create_order_with_cancel(ProductId(1), 1500, &cancel)
                    .await
            })
        };

        // Hold the insert in flight, then cancel.
        let (pending, _responder) = expect_create(&mut requests).await.unwrap();
        assert_eq!(pending.status, OrderStatus::Pending);
        cancel.cancel();

        assert_eq!(task.await.unwrap().unwrap_err(), AdmissionError::Cancelled);
    }

    #[tokio::test]
    async fn test_accepted_order_is_published_once() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_create().return_ok(stored(11));
        let publisher = Arc::new(RecordingPublisher::default());
        let admission = admission_with(OrderClient::new(mock.client()), publisher.clone());

        let order = admission.create_order(ProductId(1), 1500).await.unwrap();
        assert_eq!(order.id, OrderId(11));
        assert_eq!(order.status, OrderStatus::Pending);

        admission.shutdown().await;
        let events = publisher.events.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, ORDER_CREATED);
        assert_eq!(events[0].1.order_id(), OrderId(11));
    }

    #[tokio::test]
    async fn test_listing_is_served_from_cache_until_a_write() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_find().return_ok(vec![stored(1)]);
        mock.expect_create().return_ok(stored(2));
        mock.expect_find().return_ok(vec![stored(1), stored(2)]);
        let admission = admission_with(OrderClient::new(mock.client()), Arc::default());

        assert_eq!(admission.get_orders_by_product(ProductId(1)).await.unwrap().len(), 1);
        // Served from the listing cache; no store round-trip expected.
        assert_eq!(admission.get_orders_by_product(ProductId(1)).await.unwrap().len(), 1);

        admission.create_order(ProductId(1), 1500).await.unwrap();
        assert_eq!(admission.get_orders_by_product(ProductId(1)).await.unwrap().len(), 2);
        mock.verify();
    }

    #[tokio::test]
    async fn test_empty_listing_is_not_found() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_find().return_ok(vec![]);
        let admission = admission_with(OrderClient::new(mock.client()), Arc::default());

        let err = admission.get_orders_by_product(ProductId(1)).await.unwrap_err();
        assert!(matches!(err, AdmissionError::OrderNotFound(_)));
    }
}
