//! # Resource Actor
//!
//! A small, generic actor-owned record store built on Tokio. One [`ResourceActor`]
//! owns every record of a type and processes requests one at a time, so inserts are
//! atomic and ids are assigned without locks.
//!
//! ## Architecture Overview
//!
//! 1. **Entity Layer** ([`ActorEntity`]) - the record type, its payloads and hooks
//! 2. **Runtime Layer** ([`ResourceActor`]) - message processing and id assignment
//! 3. **Interface Layer** ([`ResourceClient`], [`ActorClient`]) - type-safe communication
//!
//! ## Requests
//!
//! | Request | Answer |
//! |---------|--------|
//! | `Create` | the stored record, id assigned |
//! | `Get` | the record or `None` |
//! | `Find` | every record accepted by [`ActorEntity::matches`] |
//! | `Action` | the record-specific [`ActorEntity::ActionResult`] |
//!
//! ## Context Injection
//!
//! Dependencies are injected at **runtime** via `run(context)`, not at construction
//! time, so actors that depend on each other can all be created first and wired second.
//!
//! ## Testing
//!
//! See the [`mock`] module for `MockClient`, which answers requests from a queue of
//! expectations without spawning an actor.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;

// Re-export core types for convenience
pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};
