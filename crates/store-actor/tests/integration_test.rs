use store_actor::{ActorEntity, FrameworkError, ResourceActor};
use async_trait::async_trait;

// --- Test Entity ---

#[derive(Clone, Debug, PartialEq)]
struct Invoice {
    id: u32,
    customer: String,
    state: InvoiceState,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum InvoiceState {
    Open,
    Settled,
    Voided,
}

#[derive(Debug)]
struct InvoiceCreate {
    customer: String,
}

#[derive(Debug)]
struct InvoiceUpdate {
    customer: Option<String>,
}

#[derive(Debug)]
struct ByState(InvoiceState);

#[derive(Debug)]
enum InvoiceAction {
    /// Settle only if still open; reports whether it applied.
    SettleIfOpen,
    Void,
}

#[derive(Debug, thiserror::Error)]
enum InvoiceError {
    #[error("customer name must not be empty")]
    EmptyCustomer,
    #[error("invoice already voided")]
    AlreadyVoided,
}

#[async_trait]
impl ActorEntity for Invoice {
    type Id = u32;
    type Create = InvoiceCreate;
    type Update = InvoiceUpdate;
    type Query = ByState;
    type Action = InvoiceAction;
    type ActionResult = bool;
    type Context = ();
    type Error = InvoiceError;

    fn from_create_params(id: u32, params: InvoiceCreate) -> Result<Self, Self::Error> {
        if params.customer.is_empty() {
            return Err(InvoiceError::EmptyCustomer);
        }
        Ok(Self {
            id,
            customer: params.customer,
            state: InvoiceState::Open,
        })
    }

    fn matches(&self, query: &ByState) -> bool {
        self.state == query.0
    }

    async fn on_update(
        &mut self,
        update: InvoiceUpdate,
        _ctx: &Self::Context,
    ) -> Result<(), Self::Error> {
        if let Some(customer) = update.customer {
            self.customer = customer;
        }
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: InvoiceAction,
        _ctx: &Self::Context,
    ) -> Result<bool, Self::Error> {
        match action {
            InvoiceAction::SettleIfOpen => {
                if self.state != InvoiceState::Open {
                    return Ok(false);
                }
                self.state = InvoiceState::Settled;
                Ok(true)
            }
            InvoiceAction::Void => {
                if self.state == InvoiceState::Voided {
                    return Err(InvoiceError::AlreadyVoided);
                }
                self.state = InvoiceState::Voided;
                Ok(true)
            }
        }
    }
}

// --- Tests ---

#[tokio::test]
async fn test_store_full_lifecycle() {
    let (actor, client) = ResourceActor::<Invoice>::new(10);
    let handle = tokio::spawn(actor.run(()));

    // 1. Create
    let id = client
        .create(InvoiceCreate {
            customer: "Alice".into(),
        })
        .await
        .unwrap();
    assert_eq!(id, 1);

    // 2. Conditional action applies once
    assert!(client.perform_action(id, InvoiceAction::SettleIfOpen).await.unwrap());
    assert!(!client.perform_action(id, InvoiceAction::SettleIfOpen).await.unwrap());

    // 3. Update
    let updated = client
        .update(
            id,
            InvoiceUpdate {
                customer: Some("Bob".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.customer, "Bob");
    assert_eq!(updated.state, InvoiceState::Settled);

    // 4. Delete
    client.delete(id).await.unwrap();
    assert!(client.get(id).await.unwrap().is_none());

    drop(client);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_list_filters_and_keeps_insertion_order() {
    let (actor, client) = ResourceActor::<Invoice>::new(10);
    tokio::spawn(actor.run(()));

    for customer in ["a", "b", "c", "d"] {
        client
            .create(InvoiceCreate {
                customer: customer.into(),
            })
            .await
            .unwrap();
    }
    client.perform_action(2, InvoiceAction::SettleIfOpen).await.unwrap();
    client.delete(3).await.unwrap();

    let open: Vec<String> = client
        .list(ByState(InvoiceState::Open))
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.customer)
        .collect();
    assert_eq!(open, vec!["a".to_string(), "d".to_string()]);

    let settled = client.list(ByState(InvoiceState::Settled)).await.unwrap();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].id, 2);
}

#[tokio::test]
async fn test_entity_errors_are_boxed_and_downcastable() {
    let (actor, client) = ResourceActor::<Invoice>::new(10);
    tokio::spawn(actor.run(()));

    let err = client
        .create(InvoiceCreate {
            customer: String::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.entity_error::<InvoiceError>(),
        Some(InvoiceError::EmptyCustomer)
    ));

    let id = client
        .create(InvoiceCreate {
            customer: "Carol".into(),
        })
        .await
        .unwrap();
    client.perform_action(id, InvoiceAction::Void).await.unwrap();
    let err = client.perform_action(id, InvoiceAction::Void).await.unwrap_err();
    assert!(matches!(
        err.entity_error::<InvoiceError>(),
        Some(InvoiceError::AlreadyVoided)
    ));
}

#[tokio::test]
async fn test_missing_record_reports_not_found() {
    let (actor, client) = ResourceActor::<Invoice>::new(10);
    tokio::spawn(actor.run(()));

    assert!(client.get(42).await.unwrap().is_none());
    let err = client
        .perform_action(42, InvoiceAction::SettleIfOpen)
        .await
        .unwrap_err();
    assert!(matches!(err, FrameworkError::NotFound(ref id) if id == "42"));
}

#[tokio::test]
async fn test_concurrent_conditional_actions_apply_exactly_once() {
    let (actor, client) = ResourceActor::<Invoice>::new(64);
    tokio::spawn(actor.run(()));

    let id = client
        .create(InvoiceCreate {
            customer: "Dave".into(),
        })
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            client.perform_action(id, InvoiceAction::SettleIfOpen).await
        }));
    }

    let mut applied = 0;
    for task in tasks {
        if task.await.unwrap().unwrap() {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn test_client_reports_closed_actor() {
    let (actor, client) = ResourceActor::<Invoice>::new(10);
    drop(actor);

    let err = client.get(1).await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(matches!(err, FrameworkError::ActorClosed));
}
