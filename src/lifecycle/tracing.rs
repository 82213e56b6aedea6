//! # Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging with the `tracing` crate. Every
//! component logs with structured fields (`product_id`, `order_id`, `error`), and the
//! client and pipeline entry points open spans with `#[instrument]`, so one request reads
//! as a hierarchy.
//!
//! ## Configuration
//!
//! The compact format hides the module prefix (`with_target(false)`); the level comes
//! from `RUST_LOG`.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=order_admission::cache=debug,info cargo run
//! ```
//!
//! ## Debug Flag for Full Payload
//!
//! Entry points log their full payload once at `debug`:
//!
//! ```rust,ignore
//! debug!(?order, "insert called");
//! ```
//!
//! ## Workflow Trace Example
//!
//! **With `RUST_LOG=info`**:
//!
//! ```text
//! INFO Cache warmup complete loaded=10 missing=0 failed=0
//! INFO Created entity_type="Order" id=order_1 size=1
//! INFO create_order{product_id=1}: Order accepted order_id=1
//! INFO reconcile{order_id=1 product_id=1}: Order settled topic="order.qty_confirmed"
//! ```
//!
//! **With `RUST_LOG=debug`** the cache path shows up as well:
//!
//! ```text
//! DEBUG create_order{product_id=1}:resolve{product_id=1}: Remote tier miss
//! DEBUG create_order{product_id=1}:insert{product_id=product_1}: insert called order=Order { .. }
//! ```
//!
//! Rejections are logged at `warn` with the error, never at `error`: an overloaded
//! service or an unknown product is an expected outcome.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();
}
