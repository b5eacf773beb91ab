//! # Mock Gateway
//!
//! `MockGateway` implements [`OrderGateway`] from queued expectations instead of a store.
//! Use it when a test has to assert the *exact* payload sent to the backend, or that no
//! remote call happened at all.
//!
//! | Feature | MockGateway | InMemoryBackend |
//! |---------|-------------|-----------------|
//! | **State** | None, answers are scripted | Real orders and broadcasts |
//! | **Payload checks** | Every call is recorded | Only the resulting state |
//! | **Error Injection** | `return_err` per call | `fail_next` per operation |
//! | **Use Case** | Core and flow logic in isolation | Multi-device end-to-end flows |
//!
//! ```rust
//! use std::sync::Arc;
//! use table_order::gateway::{GatewayCall, MockGateway, OrderGateway};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockGateway::new();
//!     mock.expect_find_active_orders().return_ok(vec![]);
//!
//!     let gateway: Arc<dyn OrderGateway> = Arc::new(mock.clone());
//!     let orders = gateway.find_active_orders(&"table_7".into()).await.unwrap();
//!     assert!(orders.is_empty());
//!
//!     assert!(matches!(mock.calls()[0], GatewayCall::FindActiveOrders(_)));
//!     mock.verify();
//! }
//! ```
//!
//! Subscriptions are not scripted: `subscribe` always succeeds and [`push`](MockGateway::push)
//! delivers a patch to every open subscription.

use super::{
    AssistanceRequest, FeedbackRequest, GatewayError, OrderGateway, StatusTransitionRequest,
    UpsertItemRequest, UpsertItemResponse,
};
use crate::model::{Order, OrderId, OrderPatch, TableId};
use async_trait::async_trait;
use replica_framework::{Publisher, Subscription, SubscriptionId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One call the mock received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    FindActiveOrders(TableId),
    FindOrder(OrderId),
    Subscribe(OrderId),
    Unsubscribe(SubscriptionId),
    UpsertOrderItem(UpsertItemRequest),
    TransitionStatus(StatusTransitionRequest),
    RequestAssistance(AssistanceRequest),
    SubmitFeedback(FeedbackRequest),
}

type Queue<T> = Arc<Mutex<VecDeque<Result<T, GatewayError>>>>;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Expectations {
    find_active_orders: Queue<Vec<Order>>,
    find_order: Queue<Option<Order>>,
    upsert_order_item: Queue<UpsertItemResponse>,
    transition_status: Queue<()>,
    request_assistance: Queue<()>,
    submit_feedback: Queue<()>,
}

/// A scripted gateway. Clones share expectations, recorded calls and subscriptions.
#[derive(Clone, Default)]
pub struct MockGateway {
    expectations: Arc<Expectations>,
    calls: Arc<Mutex<Vec<GatewayCall>>>,
    unexpected: Arc<Mutex<Vec<String>>>,
    publishers: Arc<Mutex<Vec<(OrderId, Publisher<OrderPatch>)>>>,
    next_subscription: Arc<Mutex<u64>>,
}

/// Queues the answer for one expected call.
pub struct ExpectationBuilder<T> {
    queue: Queue<T>,
}

impl<T> ExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T) {
        locked(&self.queue).push_back(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: GatewayError) {
        locked(&self.queue).push_back(Err(error));
    }
}

impl MockGateway {
    /// Creates a new mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_find_active_orders(&self) -> ExpectationBuilder<Vec<Order>> {
        ExpectationBuilder {
            queue: self.expectations.find_active_orders.clone(),
        }
    }

    pub fn expect_find_order(&self) -> ExpectationBuilder<Option<Order>> {
        ExpectationBuilder {
            queue: self.expectations.find_order.clone(),
        }
    }

    pub fn expect_upsert_order_item(&self) -> ExpectationBuilder<UpsertItemResponse> {
        ExpectationBuilder {
            queue: self.expectations.upsert_order_item.clone(),
        }
    }

    pub fn expect_transition_status(&self) -> ExpectationBuilder<()> {
        ExpectationBuilder {
            queue: self.expectations.transition_status.clone(),
        }
    }

    pub fn expect_request_assistance(&self) -> ExpectationBuilder<()> {
        ExpectationBuilder {
            queue: self.expectations.request_assistance.clone(),
        }
    }

    pub fn expect_submit_feedback(&self) -> ExpectationBuilder<()> {
        ExpectationBuilder {
            queue: self.expectations.submit_feedback.clone(),
        }
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<GatewayCall> {
        locked(&self.calls).clone()
    }

    /// Recorded upsert payloads, in order.
    pub fn upserts(&self) -> Vec<UpsertItemRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::UpsertOrderItem(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Recorded status transitions, in order.
    pub fn transitions(&self) -> Vec<StatusTransitionRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::TransitionStatus(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Delivers a patch to every open subscription of `order_id`. Returns how many received it.
    pub fn push(&self, order_id: &OrderId, patch: OrderPatch) -> usize {
        let mut publishers = locked(&self.publishers);
        publishers.retain(|(_, publisher)| !publisher.is_closed());
        publishers
            .iter()
            .filter(|(id, _)| id == order_id)
            .filter(|(_, publisher)| publisher.publish(patch.clone()))
            .count()
    }

    pub fn open_subscriptions(&self) -> usize {
        let mut publishers = locked(&self.publishers);
        publishers.retain(|(_, publisher)| !publisher.is_closed());
        publishers.len()
    }

    /// Verifies that all expectations were met and nothing unexpected was called.
    pub fn verify(&self) {
        let unexpected = locked(&self.unexpected);
        if !unexpected.is_empty() {
            panic!("Unexpected gateway calls: {:?}", *unexpected);
        }
        let remaining = locked(&self.expectations.find_active_orders).len()
            + locked(&self.expectations.find_order).len()
            + locked(&self.expectations.upsert_order_item).len()
            + locked(&self.expectations.transition_status).len()
            + locked(&self.expectations.request_assistance).len()
            + locked(&self.expectations.submit_feedback).len();
        if remaining > 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }

    fn record(&self, call: GatewayCall) {
        locked(&self.calls).push(call);
    }

    fn answer<T>(&self, queue: &Queue<T>, operation: &str) -> Result<T, GatewayError> {
        match locked(queue).pop_front() {
            Some(response) => response,
            None => {
                locked(&self.unexpected).push(operation.to_string());
                Err(GatewayError::Transport(format!(
                    "no expectation set for {operation}"
                )))
            }
        }
    }
}

#[async_trait]
impl OrderGateway for MockGateway {
    async fn find_active_orders(&self, table_id: &TableId) -> Result<Vec<Order>, GatewayError> {
        self.record(GatewayCall::FindActiveOrders(table_id.clone()));
        self.answer(&self.expectations.find_active_orders, "find_active_orders")
    }

    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, GatewayError> {
        self.record(GatewayCall::FindOrder(order_id.clone()));
        self.answer(&self.expectations.find_order, "find_order")
    }

    async fn subscribe(
        &self,
        order_id: &OrderId,
    ) -> Result<Subscription<OrderPatch>, GatewayError> {
        self.record(GatewayCall::Subscribe(order_id.clone()));
        let id = {
            let mut next = locked(&self.next_subscription);
            *next += 1;
            SubscriptionId(*next)
        };
        let (publisher, subscription) = Subscription::channel(id);
        locked(&self.publishers).push((order_id.clone(), publisher));
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) {
        self.record(GatewayCall::Unsubscribe(subscription));
        locked(&self.publishers).retain(|(_, publisher)| publisher.id() != subscription);
    }

    async fn upsert_order_item(
        &self,
        request: UpsertItemRequest,
    ) -> Result<UpsertItemResponse, GatewayError> {
        self.record(GatewayCall::UpsertOrderItem(request));
        self.answer(&self.expectations.upsert_order_item, "upsert_order_item")
    }

    async fn transition_status(
        &self,
        request: StatusTransitionRequest,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::TransitionStatus(request));
        self.answer(&self.expectations.transition_status, "transition_status")
    }

    async fn request_assistance(&self, request: AssistanceRequest) -> Result<(), GatewayError> {
        self.record(GatewayCall::RequestAssistance(request));
        self.answer(&self.expectations.request_assistance, "request_assistance")
    }

    async fn submit_feedback(&self, request: FeedbackRequest) -> Result<(), GatewayError> {
        self.record(GatewayCall::SubmitFeedback(request));
        self.answer(&self.expectations.submit_feedback, "submit_feedback")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderStatus;

    #[tokio::test]
    async fn test_scripted_answers_in_order() {
        let mock = MockGateway::new();
        mock.expect_transition_status()
            .return_err(GatewayError::Transport("timeout".to_string()));
        mock.expect_transition_status().return_ok(());

        let request = StatusTransitionRequest {
            order_id: "order_1".into(),
            new_status: OrderStatus::Received,
            details: Default::default(),
        };
        assert!(mock.transition_status(request.clone()).await.is_err());
        assert!(mock.transition_status(request.clone()).await.is_ok());

        assert_eq!(mock.transitions(), vec![request.clone(), request]);
        mock.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected gateway calls")]
    async fn test_unexpected_call_fails_verify() {
        let mock = MockGateway::new();
        let result = mock.find_order(&"order_1".into()).await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
        mock.verify();
    }

    #[tokio::test]
    async fn test_push_reaches_open_subscriptions_only() {
        let mock = MockGateway::new();
        let order_id = OrderId::from("order_1");
        let mut open = mock.subscribe(&order_id).await.unwrap();
        let closed = mock.subscribe(&order_id).await.unwrap();
        mock.unsubscribe(closed.id()).await;

        let delivered = mock.push(&order_id, OrderPatch::status(OrderStatus::Served));
        assert_eq!(delivered, 1);
        assert_eq!(
            open.recv().await.and_then(|patch| patch.status),
            Some(OrderStatus::Served)
        );
        assert_eq!(mock.open_subscriptions(), 1);
    }
}
