use super::PoolError;
use crate::metrics::PoolUsage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::debug;

const GATE_NAME: &str = "admission queue";

/// Fixed-capacity gate in front of order creation.
///
/// A request holds its [`AdmissionTicket`] for its whole lifetime; when all tickets
/// are out, new requests wait at most the configured time and are then rejected.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// Proof of admission. Dropping it frees the slot.
#[derive(Debug)]
pub struct AdmissionTicket {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Takes a ticket, waiting at most `wait`. A zero `wait` never suspends.
    pub async fn enter(&self, wait: Duration) -> Result<AdmissionTicket, PoolError> {
        let saturated = || PoolError::Saturated {
            pool: GATE_NAME.to_string(),
            waited: wait,
        };
        let closed = || PoolError::Closed {
            pool: GATE_NAME.to_string(),
        };

        let permit = if wait.is_zero() {
            match self.permits.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(TryAcquireError::NoPermits) => return Err(saturated()),
                Err(TryAcquireError::Closed) => return Err(closed()),
            }
        } else {
            match tokio::time::timeout(wait, self.permits.clone().acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(closed()),
                Err(_) => return Err(saturated()),
            }
        };
        debug!(in_flight = self.usage().in_use, "Admitted");
        Ok(AdmissionTicket { _permit: permit })
    }

    /// Stops admitting; waiting and future requests are rejected as closed.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn usage(&self) -> PoolUsage {
        PoolUsage {
            in_use: self.capacity.saturating_sub(self.permits.available_permits()),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_gate_rejects_immediately_with_zero_wait() {
        let gate = AdmissionGate::new(1);
        let _held = gate.enter(Duration::ZERO).await.unwrap();

        let err = gate.enter(Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, PoolError::Saturated { .. }));
    }

    #[tokio::test]
    async fn test_bounded_wait_then_rejection() {
        let gate = AdmissionGate::new(1);
        let _held = gate.enter(Duration::ZERO).await.unwrap();

        let started = std::time::Instant::now();
        let err = gate.enter(Duration::from_millis(30)).await.unwrap_err();
        assert!(matches!(err, PoolError::Saturated { .. }));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_released_ticket_frees_the_slot() {
        let gate = AdmissionGate::new(1);
        let ticket = gate.enter(Duration::ZERO).await.unwrap();
        assert_eq!(gate.usage().in_use, 1);
        drop(ticket);

        assert!(gate.enter(Duration::ZERO).await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_gate() {
        let gate = AdmissionGate::new(4);
        gate.close();
        assert!(matches!(
            gate.enter(Duration::from_millis(10)).await,
            Err(PoolError::Closed { .. })
        ));
    }
}
