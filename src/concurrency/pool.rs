use super::PoolError;
use crate::metrics::PoolUsage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

/// Named, fixed-size pool of worker slots for one downstream dependency.
///
/// Keeping one pool per dependency means a slow dependency only exhausts its own slots.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: String,
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot; dropping it returns the slot to the pool.
#[derive(Debug)]
pub struct WorkerSlot {
    _permit: OwnedSemaphorePermit,
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits at most `timeout` for a free slot.
    pub async fn acquire(&self, timeout: Duration) -> Result<WorkerSlot, PoolError> {
        match tokio::time::timeout(timeout, self.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(WorkerSlot { _permit: permit }),
            Ok(Err(_)) => Err(PoolError::Closed {
                pool: self.name.clone(),
            }),
            Err(_) => {
                warn!(pool = %self.name, ?timeout, "Worker slot acquire timed out");
                Err(PoolError::Saturated {
                    pool: self.name.clone(),
                    waited: timeout,
                })
            }
        }
    }

    /// Waits until every slot is free, or `timeout` passes. Returns whether the pool drained.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let all = u32::try_from(self.capacity).unwrap_or(u32::MAX);
        matches!(
            tokio::time::timeout(timeout, self.permits.acquire_many(all)).await,
            Ok(Ok(_))
        )
    }

    pub fn usage(&self) -> PoolUsage {
        PoolUsage {
            in_use: self.capacity.saturating_sub(self.permits.available_permits()),
            capacity: self.capacity,
        }
    }
}
