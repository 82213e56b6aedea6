//! # Service Lifecycle & Orchestration
//!
//! Individual components are simple; wiring them together is where the complexity
//! lives. [`OrderSystem`] is the conductor:
//!
//! 1. **Actor Creation** - the order store and the in-process catalog
//! 2. **Collaborator Selection** - HTTP catalog or in-process catalog, Redis or in-process
//!    shared cache tier, depending on [`AdmissionConfig`](crate::config::AdmissionConfig)
//! 3. **Pipeline Assembly** - product cache, admission pipeline, broker, reconciler
//! 4. **Background Tasks** - periodic stats line, delayed cache warmup
//! 5. **Graceful Shutdown** - stop admission, drain queued events, stop background tasks,
//!    then let the actors exit once their channels close
//!
//! ## Dependency Injection via Context
//!
//! Actors are created without dependencies and receive them in `run(context)`. Neither
//! the order store nor the catalog needs anything, so both run with `()`; the reconciler
//! is a plain task that owns clones of both clients.
//!
//! ## Graceful Shutdown
//!
//! Actors stop when every client clone is dropped: `receiver.recv()` returns `None`,
//! the loop logs its final size and exits. [`OrderSystem::shutdown`] drops its own clones
//! and waits a bounded time for the actors, since the HTTP server may still hold the
//! pipeline while it finishes in-flight requests.
//!
//! ## Observability & Tracing
//!
//! [`setup_tracing`] installs the subscriber once per process:
//!
//! ```bash
//! RUST_LOG=info cargo run      # Compact logs
//! RUST_LOG=debug cargo run     # Full payloads
//! ```

pub mod order_system;
pub mod tracing;

pub use order_system::*;
pub use tracing::*;
