//! # Multi-Level Product Cache
//!
//! ```text
//! resolve(id) ──▶ LocalTier (DashMap) ──hit──▶ return
//!                     │ miss
//!                     ▼
//!               Coalescer (one load per id)
//!                     │
//!                     ├──▶ RemoteTier (short timeout) ──hit──▶ fill local, return
//!                     │ miss / timeout / error
//!                     ▼
//!               ProductLookup (origin timeout) ──found──▶ fill local now,
//!                                                          fill remote in background
//! ```
//!
//! Not-found is never cached. A product with `qty == 0` is a normal hit; deciding what
//! an empty shelf means is left to the caller.

pub mod coalesce;
pub mod listing;
pub mod local;
pub mod remote;

pub use coalesce::Coalescer;
pub use listing::OrderListingCache;
pub use local::{CacheEntry, LocalTier};
pub use remote::{RedisTier, RemoteError, RemoteTier, SharedMemoryTier};

use crate::clients::{LookupError, ProductLookup};
use crate::metrics::MetricsCollector;
use crate::model::{ProductId, ProductInfo};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

const WARMUP_PARALLELISM: usize = 10;
const WARMUP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("product lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("product lookup failed: {0}")]
    Origin(LookupError),
}

pub type Resolution = Result<Option<ProductInfo>, CacheError>;

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub local_ttl: Duration,
    pub remote_ttl: Duration,
    pub remote_timeout: Duration,
    pub origin_timeout: Duration,
    /// Upper bound for the background write to the remote tier.
    pub remote_write_budget: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            local_ttl: Duration::from_secs(30),
            remote_ttl: Duration::from_secs(300),
            remote_timeout: Duration::from_millis(30),
            origin_timeout: Duration::from_millis(150),
            remote_write_budget: Duration::from_millis(100),
        }
    }
}

/// Outcome of [`ProductCache::warmup`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarmupReport {
    pub loaded: usize,
    pub missing: usize,
    pub failed: usize,
}

pub struct ProductCache {
    local: LocalTier,
    remote: Option<Arc<dyn RemoteTier>>,
    origin: Arc<dyn ProductLookup>,
    coalescer: Coalescer<ProductId, Resolution>,
    settings: CacheSettings,
    metrics: Arc<dyn MetricsCollector>,
}

impl ProductCache {
    pub fn new(
        origin: Arc<dyn ProductLookup>,
        remote: Option<Arc<dyn RemoteTier>>,
        settings: CacheSettings,
        metrics: Arc<dyn MetricsCollector>,
    ) -> Self {
        Self {
            local: LocalTier::new(settings.local_ttl),
            remote,
            origin,
            coalescer: Coalescer::new(),
            settings,
            metrics,
        }
    }

    pub fn local(&self) -> &LocalTier {
        &self.local
    }

    #[instrument(skip_all, fields(product_id = id.0))]
    pub async fn resolve(&self, id: ProductId) -> Resolution {
        if let Some(info) = self.local.get(id) {
            self.metrics.cache_hit();
            return Ok(Some(info));
        }
        self.metrics.cache_miss();
        self.coalescer.run(id, || self.load(id)).await
    }

    async fn load(&self, id: ProductId) -> Resolution {
        // A previous leader may have filled the local tier while we queued.
        if let Some(info) = self.local.get(id) {
            return Ok(Some(info));
        }

        if let Some(remote) = &self.remote {
            match timeout(self.settings.remote_timeout, remote.get(id)).await {
                Ok(Ok(Some(info))) => {
                    debug!("Remote tier hit");
                    self.local.insert(info.clone());
                    return Ok(Some(info));
                }
                Ok(Ok(None)) => debug!("Remote tier miss"),
                Ok(Err(e)) => debug!(error = %e, "Remote tier failed"),
                Err(_) => debug!("Remote tier timed out"),
            }
        }

        let budget = self.settings.origin_timeout;
        let fetched = match timeout(budget, self.origin.fetch(id, budget)).await {
            Ok(Ok(found)) => found,
            Ok(Err(LookupError::Timeout(elapsed))) => return Err(CacheError::Timeout(elapsed)),
            Ok(Err(e)) => return Err(CacheError::Origin(e)),
            Err(_) => return Err(CacheError::Timeout(budget)),
        };

        let Some(info) = fetched else {
            debug!("Product not found at origin");
            return Ok(None);
        };
        self.local.insert(info.clone());
        self.write_remote(info.clone());
        Ok(Some(info))
    }

    /// Best-effort, detached write to the remote tier.
    fn write_remote(&self, info: ProductInfo) {
        let Some(remote) = self.remote.clone() else {
            return;
        };
        let ttl = self.settings.remote_ttl;
        let budget = self.settings.remote_write_budget;
        tokio::spawn(async move {
            match timeout(budget, remote.set(&info, ttl)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(product_id = info.id.0, error = %e, "Remote cache write failed")
                }
                Err(_) => warn!(product_id = info.id.0, "Remote cache write timed out"),
            }
        });
    }

    /// Resolves `ids` with bounded parallelism so the first real requests find them cached.
    pub async fn warmup(self: &Arc<Self>, ids: Vec<ProductId>) -> WarmupReport {
        let permits = Arc::new(Semaphore::new(WARMUP_PARALLELISM));
        let mut tasks = JoinSet::new();

        for id in ids {
            let cache = Arc::clone(self);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let resolution = match timeout(WARMUP_TIMEOUT, cache.resolve(id)).await {
                    Ok(resolution) => resolution,
                    Err(_) => Err(CacheError::Timeout(WARMUP_TIMEOUT)),
                };
                resolution.map_err(|e| (id, e))
            });
        }

        let mut report = WarmupReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Some(_))) => report.loaded += 1,
                Ok(Ok(None)) => report.missing += 1,
                Ok(Err((id, e))) => {
                    warn!(product_id = id.0, error = %e, "Cache warmup failed");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Cache warmup task panicked");
                    report.failed += 1;
                }
            }
        }
        info!(
            loaded = report.loaded,
            missing = report.missing,
            failed = report.failed,
            "Cache warmup complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AtomicMetrics;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Origin that counts calls and answers from a fixed product list after a delay.
    struct CountingOrigin {
        calls: AtomicUsize,
        delay: Duration,
        products: Vec<ProductInfo>,
    }

    impl CountingOrigin {
        fn new(delay: Duration, products: Vec<ProductInfo>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                products,
            })
        }
    }

    #[async_trait]
    impl ProductLookup for CountingOrigin {
        async fn fetch(
            &self,
            id: ProductId,
            _deadline: Duration,
        ) -> Result<Option<ProductInfo>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.products.iter().find(|p| p.id == id).cloned())
        }
    }

    struct FailingRemote;

    #[async_trait]
    impl RemoteTier for FailingRemote {
        async fn get(&self, _id: ProductId) -> Result<Option<ProductInfo>, RemoteError> {
            Err(RemoteError::Backend("connection refused".into()))
        }

        async fn set(&self, _info: &ProductInfo, _ttl: Duration) -> Result<(), RemoteError> {
            Err(RemoteError::Backend("connection refused".into()))
        }
    }

    /// Remote tier that never answers.
    struct HangingRemote;

    #[async_trait]
    impl RemoteTier for HangingRemote {
        async fn get(&self, _id: ProductId) -> Result<Option<ProductInfo>, RemoteError> {
            std::future::pending().await
        }

        async fn set(&self, _info: &ProductInfo, _ttl: Duration) -> Result<(), RemoteError> {
            std::future::pending().await
        }
    }

    fn widget(qty: i64) -> ProductInfo {
        ProductInfo {
            id: ProductId(1),
            name: "Widget".into(),
            price: 1000,
            qty,
        }
    }

    fn cache_with(
        origin: Arc<CountingOrigin>,
        remote: Option<Arc<dyn RemoteTier>>,
    ) -> (Arc<ProductCache>, Arc<AtomicMetrics>) {
        let metrics = Arc::new(AtomicMetrics::new());
        let cache = ProductCache::new(origin, remote, CacheSettings::default(), metrics.clone());
        (Arc::new(cache), metrics)
    }

    #[tokio::test]
    async fn test_concurrent_misses_hit_origin_once() {
        let origin = CountingOrigin::new(Duration::from_millis(50), vec![widget(5)]);
        let (cache, _) = cache_with(origin.clone(), None);

        let (a, b) = tokio::join!(cache.resolve(ProductId(1)), cache.resolve(ProductId(1)));
        assert_eq!(a.unwrap(), Some(widget(5)));
        assert_eq!(b.unwrap(), Some(widget(5)));
        assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_origin_result_fills_local_and_remote() {
        let origin = CountingOrigin::new(Duration::ZERO, vec![widget(5)]);
        let remote = SharedMemoryTier::new();
        let (cache, metrics) = cache_with(origin.clone(), Some(Arc::new(remote.clone())));

        cache.resolve(ProductId(1)).await.unwrap();
        assert_eq!(cache.local().get(ProductId(1)), Some(widget(5)));

        cache.resolve(ProductId(1)).await.unwrap();
        assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
        let counters = metrics.counters();
        assert_eq!((counters.cache_hits, counters.cache_misses), (1, 1));

        // The remote write is detached; give it a moment.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(remote.get(ProductId(1)).await.unwrap(), Some(widget(5)));
    }

    #[tokio::test]
    async fn test_remote_hit_skips_origin() {
        let origin = CountingOrigin::new(Duration::ZERO, vec![]);
        let remote = SharedMemoryTier::new();
        remote.set(&widget(2), Duration::from_secs(60)).await.unwrap();
        let (cache, _) = cache_with(origin.clone(), Some(Arc::new(remote)));

        assert_eq!(cache.resolve(ProductId(1)).await.unwrap(), Some(widget(2)));
        assert_eq!(origin.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_broken_remote_never_fails_the_caller() {
        let origin = CountingOrigin::new(Duration::ZERO, vec![widget(5)]);
        let (cache, _) = cache_with(origin, Some(Arc::new(FailingRemote)));

        assert_eq!(cache.resolve(ProductId(1)).await.unwrap(), Some(widget(5)));
    }

    #[tokio::test]
    async fn test_slow_remote_falls_through_to_origin() {
        let origin = CountingOrigin::new(Duration::ZERO, vec![widget(5)]);
        let (cache, _) = cache_with(origin.clone(), Some(Arc::new(HangingRemote)));

        let started = std::time::Instant::now();
        assert_eq!(cache.resolve(ProductId(1)).await.unwrap(), Some(widget(5)));
        assert!(started.elapsed() < Duration::from_millis(150));
        assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let origin = CountingOrigin::new(Duration::ZERO, vec![]);
        let (cache, _) = cache_with(origin.clone(), None);

        assert_eq!(cache.resolve(ProductId(9)).await.unwrap(), None);
        assert_eq!(cache.resolve(ProductId(9)).await.unwrap(), None);
        assert_eq!(origin.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_a_hit_not_absent() {
        let origin = CountingOrigin::new(Duration::ZERO, vec![widget(0)]);
        let (cache, _) = cache_with(origin, None);

        assert_eq!(cache.resolve(ProductId(1)).await.unwrap(), Some(widget(0)));
    }

    #[tokio::test]
    async fn test_slow_origin_times_out() {
        let origin = CountingOrigin::new(Duration::from_millis(500), vec![widget(5)]);
        let (cache, _) = cache_with(origin, None);

        let err = cache.resolve(ProductId(1)).await.unwrap_err();
        assert_eq!(err, CacheError::Timeout(Duration::from_millis(150)));
    }

    #[tokio::test]
    async fn test_warmup_reports_each_product() {
        let origin = CountingOrigin::new(Duration::ZERO, vec![widget(5)]);
        let (cache, _) = cache_with(origin, None);

        let report = cache.warmup(vec![ProductId(1), ProductId(2)]).await;
        assert_eq!(
            report,
            WarmupReport {
                loaded: 1,
                missing: 1,
                failed: 0
            }
        );
        assert!(cache.local().get(ProductId(1)).is_some());
    }
}
