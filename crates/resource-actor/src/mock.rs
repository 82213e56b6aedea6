//! # Mock Framework & Testing Guide
//!
//! `MockClient<T>` hands out a real `ResourceClient<T>` whose requests are answered from
//! a queue of expectations instead of a running actor. It makes failure injection
//! (store errors, a dead actor) trivial and keeps tests deterministic.
//!
//! ## When to use Mocks vs Real Actors
//!
//! | Feature | MockClient | Real Actor |
//! |---------|------------|------------|
//! | **Speed** | Instant (in-memory) | Fast (but involves tokio spawn) |
//! | **Determinism** | 100% Deterministic | Subject to scheduler |
//! | **State** | No real state (expectations) | Real state management |
//! | **Use Case** | Unit testing logic *around* the client | Testing the actor itself or full system |
//! | **Error Injection** | Easy (`return_err`) | Hard (requires specific state) |
//!
//! ## Example
//!
//! ```rust
//! use resource_actor::mock::MockClient;
//! use resource_actor::{ActorEntity, FrameworkError};
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug)] struct Note { id: u64 }
//! #[derive(Debug)] struct NoteCreate;
//! #[derive(Debug)] enum NoteAction {}
//! #[derive(Debug, thiserror::Error)] #[error("Err")] struct NoteError;
//!
//! #[async_trait]
//! impl ActorEntity for Note {
//!     type Id = u64; type Create = NoteCreate; type Query = (); type Action = NoteAction;
//!     type ActionResult = (); type Context = (); type Error = NoteError;
//!     fn from_create_params(id: u64, _: NoteCreate) -> Result<Self, Self::Error> { Ok(Self { id }) }
//!     fn matches(&self, _: &()) -> bool { true }
//!     async fn handle_action(&mut self, a: NoteAction, _: &()) -> Result<(), Self::Error> { match a {} }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockClient::<Note>::new();
//!     let client = mock.client();
//!
//!     // Simulate a downstream failure
//!     mock.expect_create().return_err(FrameworkError::ActorClosed);
//!
//!     let result = client.create(NoteCreate).await;
//!     assert!(matches!(result, Err(FrameworkError::ActorClosed)));
//!     mock.verify();
//! }
//! ```
//!
//! Requests that arrive with no matching expectation are counted rather than answered;
//! the caller sees [`FrameworkError::ActorDropped`] and [`MockClient::verify`] fails.

use crate::{ActorEntity, FrameworkError, ResourceClient, ResourceRequest};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

enum Expectation<T: ActorEntity> {
    Get {
        response: Result<Option<T>, FrameworkError>,
    },
    Create {
        response: Result<T, FrameworkError>,
    },
    Find {
        response: Result<Vec<T>, FrameworkError>,
    },
    Action {
        response: Result<T::ActionResult, FrameworkError>,
    },
}

type Expectations<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A mock client with expectation tracking for fluent testing.
///
/// # Example
/// ```ignore
/// let mut mock = MockClient::<Order>::new();
/// mock.expect_create().return_ok(order.clone());
/// mock.expect_get(OrderId(1)).return_ok(Some(order));
///
/// let client = mock.client();
/// // Use client in tests...
/// mock.verify(); // Ensures all expectations were met
/// ```
pub struct MockClient<T: ActorEntity> {
    client: ResourceClient<T>,
    expectations: Expectations<T>,
    unexpected: Arc<AtomicUsize>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let expectations: Expectations<T> = Arc::new(Mutex::new(VecDeque::new()));
        let unexpected = Arc::new(AtomicUsize::new(0));
        let expectations_clone = expectations.clone();
        let unexpected_clone = unexpected.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let kind = request.kind();
                let expectation = match expectations_clone.lock() {
                    Ok(mut exps) => exps.pop_front(),
                    Err(_) => None,
                };

                match (request, expectation) {
                    (
                        ResourceRequest::Get { respond_to, .. },
                        Some(Expectation::Get { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Create { respond_to, .. },
                        Some(Expectation::Create { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Find { respond_to, .. },
                        Some(Expectation::Find { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Action { respond_to, .. },
                        Some(Expectation::Action { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (_, _) => {
                        tracing::error!(
                            request = kind,
                            "Unexpected request or expectation mismatch"
                        );
                        unexpected_clone.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            expectations,
            unexpected,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    /// Expects a `get` operation.
    pub fn expect_get(&mut self, _id: T::Id) -> ExpectationBuilder<T, Option<T>> {
        ExpectationBuilder::new(self.expectations.clone(), |response| Expectation::Get {
            response,
        })
    }

    /// Expects a `create` operation.
    pub fn expect_create(&mut self) -> ExpectationBuilder<T, T> {
        ExpectationBuilder::new(self.expectations.clone(), |response| Expectation::Create {
            response,
        })
    }

    /// Expects a `find` operation.
    pub fn expect_find(&mut self) -> ExpectationBuilder<T, Vec<T>> {
        ExpectationBuilder::new(self.expectations.clone(), |response| Expectation::Find {
            response,
        })
    }

    /// Expects an `action` operation.
    pub fn expect_action(&mut self, _id: T::Id) -> ExpectationBuilder<T, T::ActionResult> {
        ExpectationBuilder::new(self.expectations.clone(), |response| Expectation::Action {
            response,
        })
    }

    /// Number of requests that arrived without a matching expectation.
    pub fn unexpected_requests(&self) -> usize {
        self.unexpected.load(Ordering::SeqCst)
    }

    /// Verifies that all expectations were met and nothing unexpected arrived.
    pub fn verify(&self) {
        let remaining = self.expectations.lock().map(|exps| exps.len()).unwrap_or(0);
        if remaining != 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
        let unexpected = self.unexpected_requests();
        if unexpected != 0 {
            panic!("{} unexpected requests received", unexpected);
        }
    }
}

impl<T: ActorEntity> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder that queues the response for one expected request.
pub struct ExpectationBuilder<T: ActorEntity, R> {
    expectations: Expectations<T>,
    wrap: fn(Result<R, FrameworkError>) -> Expectation<T>,
}

impl<T: ActorEntity, R> ExpectationBuilder<T, R> {
    fn new(
        expectations: Expectations<T>,
        wrap: fn(Result<R, FrameworkError>) -> Expectation<T>,
    ) -> Self {
        Self { expectations, wrap }
    }

    fn push(self, response: Result<R, FrameworkError>) {
        if let Ok(mut exps) = self.expectations.lock() {
            exps.push_back((self.wrap)(response));
        }
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: R) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        self.push(Err(error));
    }
}

// =============================================================================
// LOW-LEVEL HELPERS
// =============================================================================

/// Creates a client and the receiver its requests arrive on.
///
/// Useful when a test needs to inspect the request payload itself or control exactly
/// when the response is sent (e.g. to hold a request in flight).
pub fn create_mock_client<T: ActorEntity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Waits for the next request; `None` unless it is a `Create`.
pub async fn expect_create<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Create, oneshot::Sender<Result<T, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Clone, Debug, PartialEq)]
    struct Ticket {
        id: u64,
        seat: String,
    }

    #[derive(Debug)]
    struct TicketCreate {
        seat: String,
    }

    #[derive(Debug)]
    enum TicketAction {
        Void,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("ticket error")]
    struct TicketError;

    #[async_trait]
    impl ActorEntity for Ticket {
        type Id = u64;
        type Create = TicketCreate;
        type Query = ();
        type Action = TicketAction;
        type ActionResult = bool;
        type Context = ();
        type Error = TicketError;

        fn from_create_params(id: u64, params: TicketCreate) -> Result<Self, Self::Error> {
            Ok(Self { id, seat: params.seat })
        }

        fn matches(&self, _: &()) -> bool {
            true
        }

        async fn handle_action(
            &mut self,
            action: TicketAction,
            _: &(),
        ) -> Result<bool, Self::Error> {
            match action {
                TicketAction::Void => Ok(true),
            }
        }
    }

    #[tokio::test]
    async fn test_low_level_create_round_trip() {
        let (client, mut receiver) = create_mock_client::<Ticket>(10);

        let create_task = tokio::spawn(async move {
            client.create(TicketCreate { seat: "12A".to_string() }).await
        });

        let (payload, responder) = expect_create(&mut receiver)
            .await
            .expect("Expected Create request");
        assert_eq!(payload.seat, "12A");
        responder
            .send(Ok(Ticket { id: 7, seat: payload.seat }))
            .unwrap();

        let ticket = create_task.await.unwrap().unwrap();
        assert_eq!(ticket.id, 7);
    }

    #[tokio::test]
    async fn test_mock_client_with_expectations() {
        let mut mock = MockClient::<Ticket>::new();
        let stored = Ticket { id: 1, seat: "3C".to_string() };
        mock.expect_create().return_ok(stored.clone());
        mock.expect_get(1).return_ok(Some(stored.clone()));
        mock.expect_action(1).return_ok(true);

        let client = mock.client();
        let created = client.create(TicketCreate { seat: "3C".to_string() }).await.unwrap();
        assert_eq!(created, stored);
        assert_eq!(client.get(1).await.unwrap(), Some(stored));
        assert!(client.perform_action(1, TicketAction::Void).await.unwrap());

        mock.verify();
    }

    #[tokio::test]
    async fn test_unexpected_request_is_counted() {
        let mock = MockClient::<Ticket>::new();
        let client = mock.client();

        let result = client.find(()).await;
        assert!(matches!(result, Err(FrameworkError::ActorDropped)));
        assert_eq!(mock.unexpected_requests(), 1);
    }
}
