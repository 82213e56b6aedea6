use crate::cache::CacheError;
use crate::concurrency::PoolError;
use crate::model::ProductId;
use crate::order_actor::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Why an order was not created or could not be read.
///
/// Publish failures never appear here; losing an event degrades silently.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdmissionError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("product {0} is out of stock")]
    ProductUnavailable(ProductId),

    #[error("product validation timed out after {0:?}")]
    ValidationTimeout(Duration),

    #[error("product validation failed: {0}")]
    Validation(CacheError),

    #[error("failed to persist order: {0}")]
    PersistenceFailure(StoreError),

    #[error("service overloaded: {0}")]
    ServiceOverloaded(PoolError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error(transparent)]
    Store(StoreError),
}
