//! Bounded-concurrency primitives.
//!
//! Every resource here has a fixed capacity and every wait is bounded:
//! - [`AdmissionGate`]: how many creations may be in progress at once
//! - [`WorkerPool`]: slots for a downstream dependency (one pool per dependency)
//! - [`TaskDispatcher`]: queue + workers for fire-and-forget jobs, drops when full

pub mod dispatch;
pub mod gate;
pub mod pool;

pub use dispatch::{DispatchError, TaskDispatcher};
pub use gate::{AdmissionGate, AdmissionTicket};
pub use pool::{WorkerPool, WorkerSlot};

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// No capacity was free within the allowed wait.
    #[error("{pool} saturated after waiting {waited:?}")]
    Saturated { pool: String, waited: Duration },

    #[error("{pool} is closed")]
    Closed { pool: String },
}
