//! Request and cache counters for the admission pipeline.
//!
//! Components record into a [`MetricsCollector`] handed to them at construction;
//! readers only ever see a [`MetricsSnapshot`].

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait MetricsCollector: Send + Sync {
    fn request_started(&self);
    fn request_succeeded(&self);
    fn request_failed(&self);
    fn cache_hit(&self);
    fn cache_miss(&self);
    fn event_published(&self);
    fn event_publish_failed(&self);
    fn event_dropped(&self);
    fn counters(&self) -> Counters;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub events_published: u64,
    pub events_failed: u64,
    pub events_dropped: u64,
}

/// Lock-free collector backed by atomics.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    events_published: AtomicU64,
    events_failed: AtomicU64,
    events_dropped: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsCollector for AtomicMetrics {
    fn request_started(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn request_succeeded(&self) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn request_failed(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn event_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    fn event_publish_failed(&self) {
        self.events_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn counters(&self) -> Counters {
        Counters {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            events_failed: self.events_failed.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Occupancy of one bounded resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PoolUsage {
    pub in_use: usize,
    pub capacity: usize,
}

impl PoolUsage {
    pub fn percent(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.in_use as f64 / self.capacity as f64 * 100.0
    }
}

/// Read-only view of the pipeline's counters and pool occupancy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    #[serde(flatten)]
    pub counters: Counters,
    pub success_rate: f64,
    pub cache_hit_rate: f64,
    pub admission: PoolUsage,
    pub db_pool: PoolUsage,
    pub event_pool: PoolUsage,
    pub event_queue: PoolUsage,
}

impl MetricsSnapshot {
    pub fn new(
        counters: Counters,
        admission: PoolUsage,
        db_pool: PoolUsage,
        event_pool: PoolUsage,
        event_queue: PoolUsage,
    ) -> Self {
        Self {
            counters,
            success_rate: ratio(counters.successful_requests, counters.total_requests),
            cache_hit_rate: ratio(counters.cache_hits, counters.cache_hits + counters.cache_misses),
            admission,
            db_pool,
            event_pool,
            event_queue,
        }
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
