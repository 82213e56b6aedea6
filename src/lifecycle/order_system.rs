use crate::admission::OrderAdmission;
use crate::broker::InMemoryBroker;
use crate::cache::{ProductCache, RedisTier, RemoteTier, SharedMemoryTier};
use crate::clients::{HttpProductLookup, LookupError, OrderClient, ProductClient, ProductLookup};
use crate::config::{AdmissionConfig, ConfigError};
use crate::metrics::{AtomicMetrics, MetricsCollector};
use crate::model::{ProductId, ORDER_CREATED};
use crate::reconciler::InventoryReconciler;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Mailbox size of each actor.
const ACTOR_BUFFER_SIZE: usize = 5000;
/// Warmup waits for the rest of the service to come up first.
const WARMUP_DELAY: Duration = Duration::from_secs(2);
const ACTOR_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build product client: {0}")]
    ProductClient(#[from] LookupError),

    #[error("task failed: {0}")]
    TaskFailed(String),
}

/// The running order admission service.
///
/// `OrderSystem` is responsible for:
/// - **Lifecycle Management**: starting and stopping actors and background tasks
/// - **Dependency Wiring**: choosing collaborators from the configuration and handing
///   them to the pipeline
///
/// # Example
///
/// ```ignore
/// let system = OrderSystem::start(AdmissionConfig::from_env()).await?;
/// let order = system.admission.create_order(ProductId(1), 1500).await?;
/// system.shutdown().await?;
/// ```
pub struct OrderSystem {
    /// The admission pipeline; share it with the HTTP layer.
    pub admission: Arc<OrderAdmission>,

    /// Client for the order store actor
    pub orders: OrderClient,

    /// Client for the in-process catalog actor
    pub products: ProductClient,

    pub broker: InMemoryBroker,

    shutdown: CancellationToken,
    background: Vec<JoinHandle<()>>,
    actors: Vec<JoinHandle<()>>,
}

impl OrderSystem {
    /// Validates `config`, spawns the actors and background tasks and assembles the
    /// pipeline. Must be called inside a Tokio runtime.
    pub async fn start(config: AdmissionConfig) -> Result<Self, LifecycleError> {
        config.validate()?;

        // 1. Actors (no dependencies)
        let (order_actor, orders) = crate::order_actor::new(ACTOR_BUFFER_SIZE);
        let (product_actor, products) = crate::product_actor::new(ACTOR_BUFFER_SIZE);
        let actors = vec![tokio::spawn(order_actor.run(())), tokio::spawn(product_actor.run(()))];

        // 2. Collaborators
        let origin: Arc<dyn ProductLookup> = match &config.product_service_url {
            Some(url) => {
                info!(%url, "Using remote product catalog");
                Arc::new(HttpProductLookup::new(url.as_str(), config.product_client_timeout)?)
            }
            None => {
                info!("Using in-process product catalog");
                Arc::new(products.clone())
            }
        };
        let remote = remote_tier(config.redis_url.as_deref()).await;

        // 3. Pipeline
        let metrics: Arc<dyn MetricsCollector> = Arc::new(AtomicMetrics::new());
        let cache = Arc::new(ProductCache::new(
            origin,
            Some(remote),
            config.cache.clone(),
            metrics.clone(),
        ));
        let broker = InMemoryBroker::new();
        let admission = Arc::new(OrderAdmission::new(
            &config,
            cache.clone(),
            Arc::new(orders.clone()),
            Arc::new(broker.clone()),
            metrics,
        ));

        // 4. Background tasks
        let shutdown = CancellationToken::new();
        let reconciler = InventoryReconciler::new(
            products.clone(),
            Arc::new(orders.clone()),
            Arc::new(broker.clone()),
        );
        let stats_interval = config.stats_interval;
        let warmup = config.warmup_products.clone();
        let background = vec![
            tokio::spawn(reconciler.run(broker.subscribe(ORDER_CREATED), shutdown.child_token())),
            tokio::spawn(log_stats(admission.clone(), stats_interval, shutdown.child_token())),
            tokio::spawn(warm_cache(cache, warmup, shutdown.child_token())),
        ];

        info!(
            admission_capacity = config.admission_queue_capacity,
            db_workers = config.db_workers,
            event_workers = config.event_workers,
            stock_policy = ?config.stock_policy,
            "Order system started"
        );

        Ok(Self {
            admission,
            orders,
            products,
            broker,
            shutdown,
            background,
            actors,
        })
    }

    /// Gracefully shuts down the service.
    ///
    /// 1. Stops admission and drains queued event publishes
    /// 2. Stops the reconciler, stats logger and warmup
    /// 3. Drops this system's clients and waits for the actors to exit
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down order system...");

        self.admission.shutdown().await;
        self.shutdown.cancel();
        self.broker.close();

        let mut failure = None;
        for handle in self.background {
            if let Err(e) = handle.await {
                error!(error = %e, "Background task failed");
                failure = Some(LifecycleError::TaskFailed(e.to_string()));
            }
        }

        drop(self.admission);
        drop(self.orders);
        drop(self.products);

        for handle in self.actors {
            match tokio::time::timeout(ACTOR_SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "Actor task failed");
                    failure = Some(LifecycleError::TaskFailed(e.to_string()));
                }
                Err(_) => warn!("Actor still has live clients; leaving it running"),
            }
        }

        match failure {
            Some(e) => Err(e),
            None => {
                info!("Order system shutdown complete.");
                Ok(())
            }
        }
    }
}

/// Redis when configured and reachable, otherwise the in-process stand-in.
async fn remote_tier(redis_url: Option<&str>) -> Arc<dyn RemoteTier> {
    if let Some(url) = redis_url {
        match RedisTier::connect(url).await {
            Ok(tier) => {
                info!("Using Redis remote cache tier");
                return Arc::new(tier);
            }
            Err(e) => warn!(error = %e, "Redis unavailable, using in-process remote cache tier"),
        }
    }
    Arc::new(SharedMemoryTier::new())
}

async fn log_stats(admission: Arc<OrderAdmission>, every: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let purged = admission.cache().local().purge_expired();
                let stats = admission.metrics();
                info!(
                    total = stats.counters.total_requests,
                    success_rate = format_args!("{:.2}%", stats.success_rate),
                    cache_hit_rate = format_args!("{:.2}%", stats.cache_hit_rate),
                    events_dropped = stats.counters.events_dropped,
                    admission_in_use = stats.admission.in_use,
                    db_pool = format_args!("{:.1}%", stats.db_pool.percent()),
                    event_pool = format_args!("{:.1}%", stats.event_pool.percent()),
                    local_cache_size = admission.cache().local().len(),
                    purged,
                    "Service stats"
                );
            }
        }
    }
}

async fn warm_cache(
    cache: Arc<ProductCache>,
    products: Vec<ProductId>,
    shutdown: CancellationToken,
) {
    if products.is_empty() {
        return;
    }
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(WARMUP_DELAY) => {
            cache.warmup(products).await;
        }
    }
}

/// Resolves once `signal` fires. A signal handler that could not be installed is
/// logged and never resolves, so the server keeps running instead of stopping at once.
pub async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_signal_resolves_when_fired() {
        let fired = tokio::time::timeout(
            Duration::from_millis(50),
            shutdown_signal(async { Ok(()) }),
        )
        .await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn test_failed_signal_handler_keeps_running() {
        let handler_error = async { Err(std::io::Error::other("no signal handler")) };
        let fired = tokio::time::timeout(Duration::from_millis(50), shutdown_signal(handler_error))
            .await;
        assert!(fired.is_err());
    }
}
