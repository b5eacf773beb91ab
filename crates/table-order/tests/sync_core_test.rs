use async_trait::async_trait;
use replica_framework::{Subscription, SubscriptionId};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use table_order::clients::OrderSyncClient;
use table_order::config::SessionConfig;
use table_order::gateway::{
    AssistanceRequest, FeedbackRequest, GatewayError, InMemoryBackend, Operation, OrderGateway,
    StatusDetails, StatusTransitionRequest, UpsertItemRequest, UpsertItemResponse,
};
use table_order::lifecycle::{SessionError, TableSession};
use table_order::model::{Order, OrderId, OrderPatch, OrderStatus, Product, TableId};
use table_order::sync_actor::{Ack, QuantityChange, SyncError, SyncPhase, SyncState, ValidationError};
use tokio::time::timeout;

fn config() -> SessionConfig {
    SessionConfig::new("resto_1", "table_7").unwrap()
}

fn empanada() -> Product {
    Product::new("p1", "Empanada", Decimal::from(2500))
}

fn pisco() -> Product {
    Product::new("p2", "Pisco Sour", Decimal::from(4500))
}

async fn start(backend: &InMemoryBackend) -> TableSession {
    TableSession::start(config(), Arc::new(backend.clone()))
        .await
        .expect("session should start")
}

async fn settle(client: &OrderSyncClient, predicate: impl FnMut(&SyncState) -> bool) -> SyncState {
    timeout(Duration::from_secs(1), client.wait_for(predicate))
        .await
        .expect("state never settled")
        .unwrap()
}

fn quantity(state: &SyncState, product: &Product) -> Option<u32> {
    state
        .order
        .as_ref()
        .and_then(|order| order.item(&product.id))
        .map(|line| line.quantity)
}

#[tokio::test]
async fn test_item_added_on_one_device_reaches_the_other() {
    let backend = InMemoryBackend::new();
    let alice = start(&backend).await;
    alice.cart().add_product(empanada()).await.unwrap();
    let order_id = alice.active_order_id().expect("first item creates the order");

    let bob = start(&backend).await;
    assert_eq!(bob.active_order_id(), Some(order_id.clone()));
    bob.cart().add_product(pisco()).await.unwrap();

    let state = settle(alice.client(), |s| quantity(s, &pisco()) == Some(1)).await;
    assert_eq!(quantity(&state, &empanada()), Some(1));
    assert_eq!(state.order.unwrap().total, Decimal::from(7000));
    assert_eq!(backend.subscriber_count(&order_id), 2);

    alice.shutdown().await;
    bob.shutdown().await;
    assert_eq!(backend.subscriber_count(&order_id), 0);
}

#[tokio::test]
async fn test_first_items_from_two_devices_share_one_order() {
    let backend = InMemoryBackend::new();
    let alice = start(&backend).await;
    let bob = start(&backend).await;

    let alice_cart = alice.cart();
    let bob_cart = bob.cart();
    let (a, b) = tokio::join!(
        alice_cart.add_product(empanada()),
        bob_cart.add_product(pisco())
    );
    assert_eq!(a, Ok(Ack::Applied));
    assert_eq!(b, Ok(Ack::Applied));

    let orders = backend.orders_for_table(&config().table_id);
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items.len(), 2);
    assert_eq!(alice.active_order_id(), Some(orders[0].id.clone()));
    assert_eq!(bob.active_order_id(), Some(orders[0].id.clone()));
}

#[tokio::test]
async fn test_concurrent_adds_of_one_product_are_serialized() {
    let backend = InMemoryBackend::new();
    let session = start(&backend).await;
    let client = session.client();

    let (first, second, third) = tokio::join!(
        client.add_item(empanada()),
        client.add_item(empanada()),
        client.add_item(empanada())
    );
    assert_eq!(first, Ok(Ack::Applied));
    assert_eq!(second, Ok(Ack::Applied));
    assert_eq!(third, Ok(Ack::Applied));

    let order_id = session.active_order_id().unwrap();
    let stored = backend.order(&order_id).unwrap();
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].quantity, 3);
    settle(client, |s| quantity(s, &empanada()) == Some(3)).await;
}

#[tokio::test]
async fn test_target_quantity_is_idempotent() {
    let backend = InMemoryBackend::new();
    let session = start(&backend).await;
    let client = session.client();
    client.add_item(empanada()).await.unwrap();

    for _ in 0..2 {
        let ack = client
            .upsert_item(empanada(), QuantityChange::Target(3))
            .await;
        assert_eq!(ack, Ok(Ack::Applied));
    }

    let order = backend.order(&session.active_order_id().unwrap()).unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 3);
    assert_eq!(order.total, Decimal::from(7500));
}

#[tokio::test]
async fn test_decrement_to_zero_removes_the_line() {
    let backend = InMemoryBackend::new();
    let session = start(&backend).await;
    let client = session.client();
    client.add_item(empanada()).await.unwrap();
    client.add_item(pisco()).await.unwrap();

    client
        .upsert_item(empanada(), QuantityChange::Delta(-1))
        .await
        .unwrap();

    let state = settle(client, |s| quantity(s, &empanada()).is_none()).await;
    let order = state.order.unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.total, Decimal::from(4500));
}

#[tokio::test]
async fn test_transition_matches_the_backend_record() {
    let backend = InMemoryBackend::new();
    let alice = start(&backend).await;
    let bob = start(&backend).await;
    alice.cart().add_product(empanada()).await.unwrap();
    alice.cart().add_product(pisco()).await.unwrap();
    bob.client().resync().await.unwrap();

    let ack = alice.cart().place_order(Some("No ice".to_string())).await;
    assert_eq!(ack, Ok(Ack::Applied));

    let order_id = alice.active_order_id().unwrap();
    let stored = backend.order(&order_id).unwrap();
    assert_eq!(stored.status, OrderStatus::Received);
    assert_eq!(alice.client().order(), Some(stored.clone()));

    let state = settle(bob.client(), |s| s.status() == Some(OrderStatus::Received)).await;
    assert_eq!(state.order.unwrap().observations.as_deref(), Some("No ice"));
}

#[tokio::test]
async fn test_items_refused_once_order_is_placed() {
    let backend = InMemoryBackend::new();
    let session = start(&backend).await;
    session.cart().add_product(empanada()).await.unwrap();
    session.cart().place_order(None).await.unwrap();

    let result = session.client().add_item(pisco()).await;
    assert_eq!(
        result,
        Err(SyncError::Validation(ValidationError::NotTakingItems(
            OrderStatus::Received
        )))
    );
}

#[tokio::test]
async fn test_backward_transition_rejected() {
    let backend = InMemoryBackend::new();
    let session = start(&backend).await;
    session.cart().add_product(empanada()).await.unwrap();
    session.cart().place_order(None).await.unwrap();

    let result = session.client().request_bill().await;
    assert_eq!(result, Ok(Ack::Applied));
    let result = session
        .client()
        .transition(OrderStatus::Served, Default::default())
        .await;
    assert_eq!(
        result,
        Err(SyncError::Validation(ValidationError::IllegalTransition {
            from: OrderStatus::BillRequested,
            to: OrderStatus::Served,
        }))
    );
}

#[tokio::test]
async fn test_ambiguous_active_orders_fail_initialization() {
    let backend = InMemoryBackend::new();
    backend.insert(Order::new("order_a", "table_7"));
    backend.insert(Order::new("order_b", "table_7"));

    let result = TableSession::start(config(), Arc::new(backend.clone())).await;
    assert!(matches!(
        result,
        Err(SessionError::Start(SyncError::AmbiguousActiveOrder { count: 2 }))
    ));
}

#[tokio::test]
async fn test_paid_orders_are_not_adopted() {
    let backend = InMemoryBackend::new();
    let mut paid = Order::new("order_old", "table_7");
    paid.status = OrderStatus::Paid;
    backend.insert(paid);

    let session = start(&backend).await;
    assert_eq!(session.active_order_id(), None);
    assert!(session.client().state().is_ready());
}

#[tokio::test]
async fn test_failed_initialization_refuses_mutations_until_retried() {
    let backend = InMemoryBackend::new();
    backend.fail_next(
        Operation::FindActiveOrders,
        GatewayError::Transport("offline".to_string()),
    );
    let session = TableSession::spawn(config(), Arc::new(backend.clone()));
    let client = session.client();

    let result = client.initialize().await;
    assert_eq!(
        result,
        Err(SyncError::InitializationFailed(GatewayError::Transport(
            "offline".to_string()
        )))
    );
    assert!(matches!(client.state().phase, SyncPhase::Failed(_)));
    assert_eq!(
        client.add_item(empanada()).await,
        Err(SyncError::SessionUnavailable)
    );
    assert!(backend.orders_for_table(&config().table_id).is_empty());

    assert_eq!(client.initialize().await, Ok(None));
    assert_eq!(client.add_item(empanada()).await, Ok(Ack::Applied));
    session.shutdown().await;
}

#[tokio::test]
async fn test_late_response_after_reset_is_stale() {
    let backend = InMemoryBackend::new();
    let session = start(&backend).await;
    let gate = backend.gate(Operation::UpsertOrderItem);

    let client = session.client().clone();
    let pending = tokio::spawn(async move { client.add_item(empanada()).await });
    settle(session.client(), |s| s.processing).await;

    session.client().reset().await.unwrap();
    gate.release();

    let ack = timeout(Duration::from_secs(1), pending)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ack, Ok(Ack::Stale));
    let state = settle(session.client(), |s| !s.processing).await;
    assert_eq!(state.order, None);
    assert!(!state.subscribed);
    // The backend still created the order; the device just never adopted it.
    assert_eq!(backend.orders_for_table(&config().table_id).len(), 1);
}

#[tokio::test]
async fn test_lost_channel_is_reopened_and_reread() {
    let backend = InMemoryBackend::new();
    let session = start(&backend).await;
    session.cart().add_product(empanada()).await.unwrap();
    let order_id = session.active_order_id().unwrap();

    backend.close_subscriptions(&order_id);
    backend.set_status(&order_id, OrderStatus::Received).unwrap();

    let state = settle(session.client(), |s| {
        s.status() == Some(OrderStatus::Received) && s.subscribed
    })
    .await;
    assert_eq!(state.order_id(), Some(&order_id));
    assert_eq!(backend.subscriber_count(&order_id), 1);

    backend.set_status(&order_id, OrderStatus::ReadyForPickup).unwrap();
    settle(session.client(), |s| {
        s.status() == Some(OrderStatus::ReadyForPickup)
    })
    .await;
}

#[tokio::test]
async fn test_resync_picks_up_an_order_created_elsewhere() {
    let backend = InMemoryBackend::new();
    let alice = start(&backend).await;
    let bob = start(&backend).await;
    alice.cart().add_product(empanada()).await.unwrap();
    assert_eq!(bob.active_order_id(), None);

    let found = bob.client().resync().await.unwrap();
    assert_eq!(found, alice.active_order_id());
    assert_eq!(quantity(&bob.client().state(), &empanada()), Some(1));
}

#[tokio::test]
async fn test_assistance_is_recorded_without_touching_the_order() {
    let backend = InMemoryBackend::new();
    let session = start(&backend).await;
    let client = session.client();

    assert_eq!(
        client.request_assistance("Napkins").await,
        Err(SyncError::NoActiveOrder)
    );

    client.add_item(empanada()).await.unwrap();
    let before = client.order();
    client.request_assistance("  More bread, please ").await.unwrap();
    assert_eq!(
        client.request_assistance("   ").await,
        Err(SyncError::Validation(ValidationError::EmptyAssistanceDetails))
    );

    let requests = backend.assistance_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].details, "More bread, please");
    assert_eq!(requests[0].order_id, session.active_order_id().unwrap());
    assert_eq!(client.order(), before);
}

#[tokio::test]
async fn test_gateway_failure_is_retryable() {
    let backend = InMemoryBackend::new();
    let session = start(&backend).await;
    session.cart().add_product(empanada()).await.unwrap();
    backend.fail_next(
        Operation::UpsertOrderItem,
        GatewayError::Transport("timeout".to_string()),
    );

    let error = session.client().add_item(pisco()).await.unwrap_err();
    assert!(error.is_retryable());
    assert!(!session.client().is_processing());

    assert_eq!(session.client().add_item(pisco()).await, Ok(Ack::Applied));
    let order_id: OrderId = session.active_order_id().unwrap();
    assert_eq!(backend.order(&order_id).unwrap().items.len(), 2);
}

/// Staff settle the order the moment the backend accepts a transition, before the device
/// hears back from its own call.
struct StaffSettlesOnTransition {
    backend: InMemoryBackend,
    settled_as: OrderStatus,
}

#[async_trait]
impl OrderGateway for StaffSettlesOnTransition {
    async fn find_active_orders(&self, table_id: &TableId) -> Result<Vec<Order>, GatewayError> {
        self.backend.find_active_orders(table_id).await
    }

    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, GatewayError> {
        self.backend.find_order(order_id).await
    }

    async fn subscribe(
        &self,
        order_id: &OrderId,
    ) -> Result<Subscription<OrderPatch>, GatewayError> {
        self.backend.subscribe(order_id).await
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) {
        self.backend.unsubscribe(subscription).await
    }

    async fn upsert_order_item(
        &self,
        request: UpsertItemRequest,
    ) -> Result<UpsertItemResponse, GatewayError> {
        self.backend.upsert_order_item(request).await
    }

    async fn transition_status(
        &self,
        request: StatusTransitionRequest,
    ) -> Result<(), GatewayError> {
        let order_id = request.order_id.clone();
        self.backend.transition_status(request).await?;
        self.backend.set_status(&order_id, self.settled_as)
    }

    async fn request_assistance(&self, request: AssistanceRequest) -> Result<(), GatewayError> {
        self.backend.request_assistance(request).await
    }

    async fn submit_feedback(&self, request: FeedbackRequest) -> Result<(), GatewayError> {
        self.backend.submit_feedback(request).await
    }
}

#[tokio::test]
async fn test_status_pushed_before_transition_answer_wins() {
    let backend = InMemoryBackend::new();
    let mut order = Order::new("order_1", "table_7");
    order.status = OrderStatus::BillRequested;
    backend.insert(order);
    let gateway = StaffSettlesOnTransition {
        backend: backend.clone(),
        settled_as: OrderStatus::Paid,
    };
    let session = TableSession::start(config(), Arc::new(gateway)).await.unwrap();

    let ack = session
        .client()
        .transition(OrderStatus::WaitingForPos, StatusDetails::default())
        .await;
    assert_eq!(ack, Ok(Ack::Applied));

    let order_id = OrderId::from("order_1");
    assert_eq!(backend.order(&order_id).unwrap().status, OrderStatus::Paid);
    // Both pushes are merged before the answer, so the published state is already final.
    assert_eq!(session.client().state().status(), Some(OrderStatus::Paid));
    settle(session.client(), |s| s.status() == Some(OrderStatus::Paid) && !s.processing).await;
}
