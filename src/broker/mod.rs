//! Topic-based event publishing.
//!
//! The admission path only needs [`EventPublisher`]; delivery guarantees belong to the
//! implementation behind it.

pub mod memory;

pub use memory::{InMemoryBroker, Subscription};

use crate::model::{CodecError, OrderEvent};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Codec(#[from] CodecError),

    #[error("broker is closed")]
    Closed,

    #[error("publish timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Fire-and-forget publish of a domain event to a topic.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, event: &OrderEvent) -> Result<(), PublishError>;
}
