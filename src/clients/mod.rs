//! Type-safe wrappers around [`ResourceClient`](resource_actor::ResourceClient) and the
//! remote catalog.

pub mod order_client;
pub mod product_client;
pub mod product_lookup;

pub use order_client::*;
pub use product_client::*;
pub use product_lookup::*;
