//! # Order Admission
//!
//! > **Accept orders fast, keep the product catalog off the hot path, settle stock later.**
//!
//! This crate admits purchase orders under heavy concurrent load. An order is validated
//! against a multi-level product cache, persisted as `pending`, and announced on an
//! event broker; stock is reserved afterwards by an inventory reconciler that confirms
//! or fails the order.
//!
//! ## 🏗️ Design Philosophy
//!
//! - **Bounded everything**: admission, persistence and event publishing each have their
//!   own capacity. When one is exhausted the caller gets `ServiceOverloaded` at once
//!   instead of joining an unbounded queue.
//! - **Deadlines per step**: product validation, persistence and reads each run under
//!   their own timeout, so one slow dependency cannot hold a request forever.
//! - **Fire-and-forget events**: a lost `order.created` never fails the request that
//!   produced it; it is logged and counted.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine (`resource_actor` crate, [`order_actor`], [`product_actor`])
//! Orders and the in-process catalog live in `ResourceActor`s: one task owns the state
//! and processes requests sequentially.
//! - **Key items**: [`OrderStore`](clients::OrderStore), [`ProductClient`](clients::ProductClient).
//!
//! ### 2. The Hot Path ([`cache`], [`concurrency`], [`admission`])
//! - [`ProductCache`](cache::ProductCache): local tier → remote tier → origin, with
//!   one in-flight lookup per product.
//! - [`AdmissionGate`](concurrency::AdmissionGate), [`WorkerPool`](concurrency::WorkerPool),
//!   [`TaskDispatcher`](concurrency::TaskDispatcher): the bounded resources.
//! - [`OrderAdmission`](admission::OrderAdmission): the pipeline itself.
//!
//! ### 3. Events ([`broker`], [`reconciler`])
//! [`InMemoryBroker`](broker::InMemoryBroker) carries [`OrderEvent`](model::OrderEvent)s;
//! [`InventoryReconciler`](reconciler::InventoryReconciler) consumes `order.created`.
//!
//! ### 4. The Orchestrator ([`lifecycle`], [`config`], [`api`])
//! [`OrderSystem`](lifecycle::OrderSystem) wires everything from an
//! [`AdmissionConfig`](config::AdmissionConfig); [`api::router`] exposes it over HTTP.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run
//! cargo test
//! ```

pub mod admission;
pub mod api;
pub mod broker;
pub mod cache;
pub mod clients;
pub mod concurrency;
pub mod config;
pub mod lifecycle;
pub mod metrics;
pub mod model;
pub mod order_actor;
pub mod product_actor;
pub mod reconciler;
