//! In-process broker
//!
//! ```text
//! publish(topic, event) ──▶ encode ──▶ broadcast::Sender<Vec<u8>> (per topic)
//!                                               │
//!                              ┌────────────────┼────────────────┐
//!                              ▼                ▼                ▼
//!                        Subscription     Subscription     Subscription
//!                        (decode)         (decode)         (decode)
//! ```
//!
//! Topics are created on first use. Publishing to a topic nobody listens to succeeds.

use super::{EventPublisher, PublishError};
use crate::model::{self, OrderEvent};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const DEFAULT_TOPIC_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    topics: Arc<DashMap<String, broadcast::Sender<Vec<u8>>>>,
    capacity: usize,
    closed: Arc<AtomicBool>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    /// `capacity` is the number of undelivered messages kept per topic before slow
    /// subscribers start lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub fn subscribe(&self, topic: &str) -> Subscription {
        Subscription {
            topic: topic.to_string(),
            receiver: self.sender(topic).subscribe(),
        }
    }

    /// Drops every topic. Subscribers drain what is buffered and then end.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.topics.clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryBroker {
    async fn publish(&self, topic: &str, event: &OrderEvent) -> Result<(), PublishError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PublishError::Closed);
        }
        let bytes = model::encode(event)?;
        // A send error only means there are no subscribers right now.
        let delivered = self.sender(topic).send(bytes).unwrap_or(0);
        debug!(topic, delivered, order_id = event.order_id().0, "Published");
        Ok(())
    }
}

/// Receiving end of one topic.
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<Vec<u8>>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next event on the topic, or `None` once the broker is closed.
    ///
    /// Undecodable messages are skipped; a lagging subscriber skips what it missed.
    pub async fn recv(&mut self) -> Option<OrderEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(bytes) => match model::decode(&bytes) {
                    Ok(event) => return Some(event),
                    Err(e) => {
                        warn!(topic = %self.topic, error = %e, "Dropping undecodable message")
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
