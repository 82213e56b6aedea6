//! # ActorEntity Trait
//!
//! The contract every stored record must satisfy to be owned by a [`ResourceActor`](crate::ResourceActor).
//! It names the id, the insert payload, the query filter and the record-specific actions,
//! and provides the hooks the actor calls while processing requests.
//!
//! # Provided Methods (Hooks)
//! - [`ActorEntity::on_create`] runs after construction and before the record becomes visible.
//!
//! The default implementation does nothing (`Ok(())`).

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any record must implement to be managed by `ResourceActor`.
///
/// # Async & Context
/// Hooks are `#[async_trait]` so they may call other actors. The `Context` type is
/// injected into every hook at `run()` time rather than at construction time, which
/// lets actors be wired together after they are all created.
#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// Identifier assigned by the actor on insert.
    /// Must be convertible from `u64` for automatic id generation.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + From<u64>;

    /// The data required to create a new record.
    type Create: Send + Sync + Debug;

    /// Filter used by `Find` requests.
    type Query: Send + Sync + Debug;

    /// Enum representing record-specific operations (e.g. a status transition).
    type Action: Send + Sync + Debug;

    /// The result type returned by custom actions.
    type ActionResult: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// One error enum per record type rather than one per action; callers match on a
    /// single type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct the full record from the assigned id and the payload.
    /// This is called synchronously before `on_create`.
    fn from_create_params(id: Self::Id, params: Self::Create) -> Result<Self, Self::Error>;

    /// Called after the record is constructed and before it is stored.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Whether this record is selected by `query`.
    fn matches(&self, query: &Self::Query) -> bool;

    /// Handle a custom record-specific action.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        _ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
