use crate::admission::StockPolicy;
use crate::cache::CacheSettings;
use crate::model::ProductId;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),

    #[error("local cache TTL ({local:?}) must not exceed remote cache TTL ({remote:?})")]
    TtlOrdering { local: Duration, remote: Duration },
}

/// Service configuration.
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | ADMISSION_QUEUE_CAPACITY | 5000 | order creations in progress at once |
/// | ADMISSION_WAIT_MS | 0 | how long a request may wait for admission |
/// | DB_WORKERS | CPUs × 20 | persistence worker slots |
/// | DB_ACQUIRE_TIMEOUT_MS | 100 | wait for a persistence slot |
/// | PERSIST_TIMEOUT_MS | 1000 | order insert deadline |
/// | EVENT_WORKERS | CPUs × 30 | concurrent event publishes |
/// | EVENT_QUEUE_CAPACITY | 1024 | queued event publishes before dropping |
/// | VALIDATION_TIMEOUT_MS | 200 | product validation deadline |
/// | REMOTE_CACHE_TIMEOUT_MS | 30 | remote cache read deadline |
/// | ORIGIN_TIMEOUT_MS | 150 | catalog lookup deadline inside the cache |
/// | PRODUCT_CLIENT_TIMEOUT_MS | 500 | HTTP client timeout for the catalog |
/// | LOCAL_CACHE_TTL_SECS | 30 | local product tier TTL |
/// | REMOTE_CACHE_TTL_SECS | 300 | remote product tier TTL |
/// | LISTING_CACHE_TTL_SECS | 10 | by-product listing cache TTL |
/// | PUBLISH_TIMEOUT_MS | 1000 | per-event publish deadline |
/// | STOCK_POLICY | defer | `defer` or `reject` orders for out-of-stock products |
/// | STATS_INTERVAL_SECS | 30 | period of the stats log line |
/// | WARMUP_PRODUCT_IDS | 1,2,…,10 | products resolved at startup |
/// | PRODUCT_SERVICE_URL | unset | remote catalog; in-process catalog when unset |
/// | REDIS_URL | unset | remote cache tier; in-process tier when unset |
/// | PORT | 8080 | HTTP port |
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub admission_queue_capacity: usize,
    pub admission_wait: Duration,
    pub db_workers: usize,
    pub db_acquire_timeout: Duration,
    pub persist_timeout: Duration,
    pub event_workers: usize,
    pub event_queue_capacity: usize,
    pub validation_timeout: Duration,
    pub cache: CacheSettings,
    pub product_client_timeout: Duration,
    pub listing_ttl: Duration,
    pub publish_timeout: Duration,
    pub get_order_timeout: Duration,
    pub list_orders_timeout: Duration,
    /// Creations slower than this are logged.
    pub slow_request_threshold: Duration,
    pub stock_policy: StockPolicy,
    pub stats_interval: Duration,
    pub warmup_products: Vec<ProductId>,
    pub product_service_url: Option<String>,
    pub redis_url: Option<String>,
    pub port: u16,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            admission_queue_capacity: 5000,
            admission_wait: Duration::ZERO,
            db_workers: cpus * 20,
            db_acquire_timeout: Duration::from_millis(100),
            persist_timeout: Duration::from_secs(1),
            event_workers: cpus * 30,
            event_queue_capacity: 1024,
            validation_timeout: Duration::from_millis(200),
            cache: CacheSettings::default(),
            product_client_timeout: Duration::from_millis(500),
            listing_ttl: Duration::from_secs(10),
            publish_timeout: Duration::from_secs(1),
            get_order_timeout: Duration::from_secs(1),
            list_orders_timeout: Duration::from_secs(2),
            slow_request_threshold: Duration::from_millis(500),
            stock_policy: StockPolicy::DeferToReconciler,
            stats_interval: Duration::from_secs(30),
            warmup_products: (1..=10).map(ProductId).collect(),
            product_service_url: None,
            redis_url: None,
            port: 8080,
        }
    }
}

impl AdmissionConfig {
    /// Loads the configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            admission_queue_capacity: env_parse("ADMISSION_QUEUE_CAPACITY")
                .unwrap_or(defaults.admission_queue_capacity),
            admission_wait: env_millis("ADMISSION_WAIT_MS").unwrap_or(defaults.admission_wait),
            db_workers: env_parse("DB_WORKERS").unwrap_or(defaults.db_workers),
            db_acquire_timeout: env_millis("DB_ACQUIRE_TIMEOUT_MS")
                .unwrap_or(defaults.db_acquire_timeout),
            persist_timeout: env_millis("PERSIST_TIMEOUT_MS").unwrap_or(defaults.persist_timeout),
            event_workers: env_parse("EVENT_WORKERS").unwrap_or(defaults.event_workers),
            event_queue_capacity: env_parse("EVENT_QUEUE_CAPACITY")
                .unwrap_or(defaults.event_queue_capacity),
            validation_timeout: env_millis("VALIDATION_TIMEOUT_MS")
                .unwrap_or(defaults.validation_timeout),
            cache: CacheSettings {
                local_ttl: env_secs("LOCAL_CACHE_TTL_SECS").unwrap_or(defaults.cache.local_ttl),
                remote_ttl: env_secs("REMOTE_CACHE_TTL_SECS").unwrap_or(defaults.cache.remote_ttl),
                remote_timeout: env_millis("REMOTE_CACHE_TIMEOUT_MS")
                    .unwrap_or(defaults.cache.remote_timeout),
                origin_timeout: env_millis("ORIGIN_TIMEOUT_MS")
                    .unwrap_or(defaults.cache.origin_timeout),
                remote_write_budget: defaults.cache.remote_write_budget,
            },
            product_client_timeout: env_millis("PRODUCT_CLIENT_TIMEOUT_MS")
                .unwrap_or(defaults.product_client_timeout),
            listing_ttl: env_secs("LISTING_CACHE_TTL_SECS").unwrap_or(defaults.listing_ttl),
            publish_timeout: env_millis("PUBLISH_TIMEOUT_MS").unwrap_or(defaults.publish_timeout),
            get_order_timeout: defaults.get_order_timeout,
            list_orders_timeout: defaults.list_orders_timeout,
            slow_request_threshold: defaults.slow_request_threshold,
            stock_policy: std::env::var("STOCK_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.stock_policy),
            stats_interval: env_secs("STATS_INTERVAL_SECS").unwrap_or(defaults.stats_interval),
            warmup_products: std::env::var("WARMUP_PRODUCT_IDS")
                .ok()
                .map(|v| parse_ids(&v))
                .unwrap_or(defaults.warmup_products),
            product_service_url: std::env::var("PRODUCT_SERVICE_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            port: env_parse("PORT").unwrap_or(defaults.port),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacities = [
            ("ADMISSION_QUEUE_CAPACITY", self.admission_queue_capacity),
            ("DB_WORKERS", self.db_workers),
            ("EVENT_WORKERS", self.event_workers),
            ("EVENT_QUEUE_CAPACITY", self.event_queue_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(ConfigError::ZeroCapacity(name));
            }
        }
        if self.cache.local_ttl > self.cache.remote_ttl {
            return Err(ConfigError::TtlOrdering {
                local: self.cache.local_ttl,
                remote: self.cache.remote_ttl,
            });
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse(key).map(Duration::from_millis)
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse(key).map(Duration::from_secs)
}

fn parse_ids(raw: &str) -> Vec<ProductId> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .map(ProductId)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AdmissionConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.stock_policy, StockPolicy::DeferToReconciler);
        assert_eq!(config.warmup_products.len(), 10);
    }

    #[test]
    fn test_local_ttl_must_not_exceed_remote() {
        let mut config = AdmissionConfig::default();
        config.cache.local_ttl = Duration::from_secs(600);
        assert!(matches!(config.validate(), Err(ConfigError::TtlOrdering { .. })));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = AdmissionConfig {
            db_workers: 0,
            ..AdmissionConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity("DB_WORKERS")));
    }

    #[test]
    fn test_parse_ids_skips_garbage() {
        assert_eq!(parse_ids("1, 2,x,3"), vec![ProductId(1), ProductId(2), ProductId(3)]);
    }
}
