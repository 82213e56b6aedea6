//! Product-specific resource logic, including stock management actions.
//!
//! This is the in-process catalog: it answers product lookups when no remote
//! catalog is configured and applies the stock reservations made by the reconciler.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;

use crate::clients::ProductClient;
use crate::model::Product;
use resource_actor::ResourceActor;

/// Creates a new Product actor and its client.
pub fn new(buffer_size: usize) -> (ResourceActor<Product>, ProductClient) {
    let (actor, generic_client) = ResourceActor::new(buffer_size);
    let client = ProductClient::new(generic_client);

    (actor, client)
}
