//! Error types for the Product actor.

use thiserror::Error;

/// Errors that can occur during product operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    /// The requested product was not found.
    #[error("Product not found: {0}")]
    NotFound(String),

    /// The requested quantity exceeds the available stock.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// The provided quantity is invalid (e.g., zero or negative).
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// The actor answered with a result that does not belong to the request.
    #[error("Unexpected action result: {0}")]
    UnexpectedResult(String),

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
