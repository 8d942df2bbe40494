//! # Mock Store & Testing Guide
//!
//! `MockClient<T>` hands out a real [`ResourceClient<T>`] whose requests are answered from a
//! queue of scripted expectations instead of a running actor. Use it to test code that sits
//! on top of a store (escalation consumer, catalog loaders) and, above all, to inject
//! failures a real actor will not produce on demand.
//!
//! | | MockClient | Real Actor |
//! |---------|------------|------------|
//! | **State** | None, scripted replies | Real records |
//! | **Determinism** | Fully deterministic | Subject to scheduler |
//! | **Error Injection** | `return_err(...)` | Hard |
//! | **Use Case** | Logic *around* the client | The store itself, full system |
//!
//! ## Scripting replies
//!
//! ```rust,ignore
//! let mut mock = MockClient::<Order>::new();
//! mock.expect_get(OrderId(1)).return_ok(Some(pending_order));
//! mock.expect_action(OrderId(1)).return_err(FrameworkError::ActorDropped);
//!
//! let store = OrderClient::new(mock.client());
//! // ... drive the code under test ...
//! mock.verify(); // every scripted reply was consumed
//! ```
//!
//! Expectations are consumed in order. A request that does not match the next expectation's
//! kind or id panics the mock task, so the caller sees `ActorDropped` and `verify` fails.
//!
//! ## Lower-level helpers
//!
//! [`create_mock_client`] returns a client plus the raw request receiver; the `expect_*`
//! functions pop the next request of a given kind and hand back its responder.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::ResourceRequest;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

enum Expectation<T: ActorEntity> {
    Get {
        id: T::Id,
        response: Result<Option<T>, FrameworkError>,
    },
    Create {
        response: Result<T::Id, FrameworkError>,
    },
    Update {
        id: T::Id,
        response: Result<T, FrameworkError>,
    },
    Delete {
        id: T::Id,
        response: Result<(), FrameworkError>,
    },
    List {
        response: Result<Vec<T>, FrameworkError>,
    },
    Action {
        id: T::Id,
        response: Result<T::ActionResult, FrameworkError>,
    },
}

impl<T: ActorEntity> Expectation<T> {
    fn describe(&self) -> String {
        match self {
            Self::Get { id, .. } => format!("Get({id})"),
            Self::Create { .. } => "Create".to_string(),
            Self::Update { id, .. } => format!("Update({id})"),
            Self::Delete { id, .. } => format!("Delete({id})"),
            Self::List { .. } => "List".to_string(),
            Self::Action { id, .. } => format!("Action({id})"),
        }
    }
}

fn describe_request<T: ActorEntity>(request: &ResourceRequest<T>) -> String {
    match request {
        ResourceRequest::Get { id, .. } => format!("Get({id})"),
        ResourceRequest::Create { .. } => "Create".to_string(),
        ResourceRequest::Update { id, .. } => format!("Update({id})"),
        ResourceRequest::Delete { id, .. } => format!("Delete({id})"),
        ResourceRequest::List { .. } => "List".to_string(),
        ResourceRequest::Action { id, .. } => format!("Action({id})"),
    }
}

type Expectations<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

fn push<T: ActorEntity>(expectations: &Expectations<T>, expectation: Expectation<T>) {
    expectations
        .lock()
        .expect("mock expectations poisoned")
        .push_back(expectation);
}

/// A mock store client with expectation tracking.
pub struct MockClient<T: ActorEntity> {
    client: ResourceClient<T>,
    expectations: Expectations<T>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock with no expectations. Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let expectations: Expectations<T> = Arc::new(Mutex::new(VecDeque::new()));
        let scripted = expectations.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let next = scripted
                    .lock()
                    .expect("mock expectations poisoned")
                    .pop_front();
                let seen = describe_request(&request);

                match (request, next) {
                    (
                        ResourceRequest::Get { id, respond_to },
                        Some(Expectation::Get {
                            id: expected,
                            response,
                        }),
                    ) if id == expected => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Create { respond_to, .. },
                        Some(Expectation::Create { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Update { id, respond_to, .. },
                        Some(Expectation::Update {
                            id: expected,
                            response,
                        }),
                    ) if id == expected => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Delete { id, respond_to },
                        Some(Expectation::Delete {
                            id: expected,
                            response,
                        }),
                    ) if id == expected => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::List { respond_to, .. },
                        Some(Expectation::List { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Action { id, respond_to, .. },
                        Some(Expectation::Action {
                            id: expected,
                            response,
                        }),
                    ) if id == expected => {
                        let _ = respond_to.send(response);
                    }
                    (_, expected) => {
                        let expected = expected
                            .map(|e| e.describe())
                            .unwrap_or_else(|| "nothing".to_string());
                        panic!("Unexpected request {seen}, expected {expected}");
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns a client wired to this mock.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    pub fn expect_get(&mut self, id: T::Id) -> GetExpectationBuilder<T> {
        GetExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_create(&mut self) -> CreateExpectationBuilder<T> {
        CreateExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_update(&mut self, id: T::Id) -> UpdateExpectationBuilder<T> {
        UpdateExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_delete(&mut self, id: T::Id) -> DeleteExpectationBuilder<T> {
        DeleteExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_list(&mut self) -> ListExpectationBuilder<T> {
        ListExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_action(&mut self, id: T::Id) -> ActionExpectationBuilder<T> {
        ActionExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Number of scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.expectations
            .lock()
            .expect("mock expectations poisoned")
            .len()
    }

    /// Panics unless every expectation was consumed.
    pub fn verify(&self) {
        let remaining = self.remaining();
        if remaining != 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

pub struct GetExpectationBuilder<T: ActorEntity> {
    id: T::Id,
    expectations: Expectations<T>,
}

impl<T: ActorEntity> GetExpectationBuilder<T> {
    pub fn return_ok(self, value: Option<T>) {
        push(
            &self.expectations,
            Expectation::Get {
                id: self.id,
                response: Ok(value),
            },
        );
    }

    pub fn return_err(self, error: FrameworkError) {
        push(
            &self.expectations,
            Expectation::Get {
                id: self.id,
                response: Err(error),
            },
        );
    }
}

pub struct CreateExpectationBuilder<T: ActorEntity> {
    expectations: Expectations<T>,
}

impl<T: ActorEntity> CreateExpectationBuilder<T> {
    pub fn return_ok(self, id: T::Id) {
        push(&self.expectations, Expectation::Create { response: Ok(id) });
    }

    pub fn return_err(self, error: FrameworkError) {
        push(
            &self.expectations,
            Expectation::Create {
                response: Err(error),
            },
        );
    }
}

pub struct UpdateExpectationBuilder<T: ActorEntity> {
    id: T::Id,
    expectations: Expectations<T>,
}

impl<T: ActorEntity> UpdateExpectationBuilder<T> {
    pub fn return_ok(self, value: T) {
        push(
            &self.expectations,
            Expectation::Update {
                id: self.id,
                response: Ok(value),
            },
        );
    }

    pub fn return_err(self, error: FrameworkError) {
        push(
            &self.expectations,
            Expectation::Update {
                id: self.id,
                response: Err(error),
            },
        );
    }
}

pub struct DeleteExpectationBuilder<T: ActorEntity> {
    id: T::Id,
    expectations: Expectations<T>,
}

impl<T: ActorEntity> DeleteExpectationBuilder<T> {
    pub fn return_ok(self) {
        push(
            &self.expectations,
            Expectation::Delete {
                id: self.id,
                response: Ok(()),
            },
        );
    }

    pub fn return_err(self, error: FrameworkError) {
        push(
            &self.expectations,
            Expectation::Delete {
                id: self.id,
                response: Err(error),
            },
        );
    }
}

pub struct ListExpectationBuilder<T: ActorEntity> {
    expectations: Expectations<T>,
}

impl<T: ActorEntity> ListExpectationBuilder<T> {
    pub fn return_ok(self, items: Vec<T>) {
        push(&self.expectations, Expectation::List { response: Ok(items) });
    }

    pub fn return_err(self, error: FrameworkError) {
        push(
            &self.expectations,
            Expectation::List {
                response: Err(error),
            },
        );
    }
}

pub struct ActionExpectationBuilder<T: ActorEntity> {
    id: T::Id,
    expectations: Expectations<T>,
}

impl<T: ActorEntity> ActionExpectationBuilder<T> {
    pub fn return_ok(self, result: T::ActionResult) {
        push(
            &self.expectations,
            Expectation::Action {
                id: self.id,
                response: Ok(result),
            },
        );
    }

    pub fn return_err(self, error: FrameworkError) {
        push(
            &self.expectations,
            Expectation::Action {
                id: self.id,
                response: Err(error),
            },
        );
    }
}

// =============================================================================
// RAW RECEIVER HELPERS
// =============================================================================

/// Creates a client and the receiver its requests land on.
///
/// Useful when a test needs to hold a request open (e.g. to observe that a caller is still
/// waiting) before answering it through the returned responder.
pub fn create_mock_client<T: ActorEntity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Pops the next request if it is a Get.
pub async fn expect_get<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, oneshot::Sender<Result<Option<T>, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Pops the next request if it is a List.
pub async fn expect_list<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Query, oneshot::Sender<Result<Vec<T>, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::List { query, respond_to }) => Some((query, respond_to)),
        _ => None,
    }
}

/// Pops the next request if it is an Action.
pub async fn expect_action<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    T::Id,
    T::Action,
    oneshot::Sender<Result<T::ActionResult, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action {
            id,
            action,
            respond_to,
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}
