//! # Order Admission Pipeline
//!
//! ```text
//! create_order(product, price)
//!   1. AdmissionGate::enter ─────────────── full ──▶ ServiceOverloaded
//!   2. ProductCache::resolve (deadline) ─── none ──▶ ProductNotFound
//!                                        └─ late ──▶ ValidationTimeout
//!   3. Order::pending
//!   4. WorkerPool "db" slot ─▶ OrderStore::insert ─▶ PersistenceFailure
//!      listing for the product invalidated
//!   5. TaskDispatcher::try_submit(publish order.created)   (full ──▶ dropped, logged)
//!   6. return the stored order
//! ```
//!
//! Step 5 runs after the response path and never changes the result.
//! A caller-supplied [`CancellationToken`](tokio_util::sync::CancellationToken) aborts
//! whichever wait is active.

pub mod error;
pub mod pipeline;

pub use error::AdmissionError;
pub use pipeline::OrderAdmission;

use serde::Serialize;
use std::str::FromStr;

/// What admission does with a product that exists but has no stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Accept the order as `pending`; the reconciler confirms or fails it.
    #[default]
    DeferToReconciler,
    /// Refuse with `ProductUnavailable` and persist nothing.
    RejectOutOfStock,
}

impl FromStr for StockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "defer" | "defer_to_reconciler" => Ok(StockPolicy::DeferToReconciler),
            "reject" | "reject_out_of_stock" => Ok(StockPolicy::RejectOutOfStock),
            other => Err(format!("unknown stock policy: {other}")),
        }
    }
}
