//! Error types for the Order actor and the store built on it.

use crate::model::OrderStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the order record itself.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// The order data provided is invalid.
    #[error("Order validation error: {0}")]
    ValidationError(String),

    /// The requested status change is not allowed from the current status.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

/// Errors surfaced by an [`OrderStore`](crate::clients::OrderStore).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The store could not be reached or dropped the request.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the record or the mutation.
    #[error("Order rejected by store: {0}")]
    Rejected(String),

    /// The addressed order does not exist.
    #[error("Order not found: {0}")]
    NotFound(String),

    /// The store did not answer within the caller's deadline.
    #[error("Order store timed out after {0:?}")]
    Timeout(Duration),

    /// The insert reported success but no identifier was assigned.
    #[error("Order store returned an order without an identifier")]
    MissingId,
}
