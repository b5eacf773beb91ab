//! # In-Memory Backend
//!
//! A complete, process-local backend for the [`OrderGateway`] contract. It keeps every
//! order in one store, applies mutations in arrival order and broadcasts the resulting
//! fields to every subscriber of the order, the initiating device included.
//!
//! Several [`OrderSyncActor`](crate::sync_actor::OrderSyncActor)s can share one backend,
//! which is how the demo and the integration tests put more than one device on a table.
//!
//! ## Test Hooks
//!
//! - [`fail_next`](InMemoryBackend::fail_next) queues an error for the next call of an
//!   operation.
//! - [`gate`](InMemoryBackend::gate) holds the next call of an operation until the returned
//!   [`Gate`] is released, which makes late responses reproducible.
//! - [`set_status`](InMemoryBackend::set_status) changes a status the way staff would,
//!   bypassing the forward-only rule.
//! - [`close_subscriptions`](InMemoryBackend::close_subscriptions) drops the push channels
//!   of an order.

use super::{
    AssistanceRequest, FeedbackRequest, GatewayError, OrderGateway, StatusTransitionRequest,
    UpsertItemRequest, UpsertItemResponse,
};
use crate::model::{Order, OrderId, OrderPatch, OrderStatus, TableId};
use async_trait::async_trait;
use replica_framework::{Publisher, ReplicaEntity, Subscription, SubscriptionId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Backend operations that test hooks can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindActiveOrders,
    FindOrder,
    Subscribe,
    UpsertOrderItem,
    TransitionStatus,
    RequestAssistance,
    SubmitFeedback,
}

/// Holds back one call until released. Dropping the gate releases it as well.
#[derive(Debug)]
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

#[derive(Default)]
struct BackendState {
    /// Insertion order doubles as creation order.
    orders: Vec<Order>,
    next_order: u64,
    next_subscription: u64,
    subscribers: HashMap<OrderId, Vec<Publisher<OrderPatch>>>,
    assistance: Vec<AssistanceRequest>,
    feedback: Vec<FeedbackRequest>,
    failures: HashMap<Operation, VecDeque<GatewayError>>,
    gates: HashMap<Operation, VecDeque<oneshot::Receiver<()>>>,
}

impl BackendState {
    fn order_mut(&mut self, order_id: &OrderId) -> Result<&mut Order, GatewayError> {
        self.orders
            .iter_mut()
            .find(|order| &order.id == order_id)
            .ok_or_else(|| GatewayError::NotFound(order_id.clone()))
    }

    fn active_for(&self, table_id: &TableId) -> Option<&Order> {
        self.orders
            .iter()
            .find(|order| &order.table_id == table_id && !order.status.is_terminal())
    }

    fn broadcast(&mut self, order_id: &OrderId, patch: &OrderPatch) {
        if let Some(publishers) = self.subscribers.get_mut(order_id) {
            publishers.retain(|publisher| publisher.publish(patch.clone()));
            debug!(%order_id, subscribers = publishers.len(), ?patch, "Broadcast");
        }
    }
}

/// Shared handle to one in-process backend. Clones see the same store.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // Never held across an await.
    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, operation: Operation) -> Result<(), GatewayError> {
        let gate = self
            .state()
            .gates
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);
        if let Some(gate) = gate {
            debug!(?operation, "Held at gate");
            let _ = gate.await;
        }
        let failure = self
            .state()
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(error) => {
                warn!(?operation, error = %error, "Injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }

    /// Stores an order as-is, without any rule checks.
    pub fn insert(&self, order: Order) {
        self.state().orders.push(order);
    }

    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.state()
            .orders
            .iter()
            .find(|order| &order.id == order_id)
            .cloned()
    }

    pub fn orders_for_table(&self, table_id: &TableId) -> Vec<Order> {
        self.state()
            .orders
            .iter()
            .filter(|order| &order.table_id == table_id)
            .cloned()
            .collect()
    }

    pub fn assistance_requests(&self) -> Vec<AssistanceRequest> {
        self.state().assistance.clone()
    }

    pub fn feedback(&self) -> Vec<FeedbackRequest> {
        self.state().feedback.clone()
    }

    /// Live push channels for an order.
    pub fn subscriber_count(&self, order_id: &OrderId) -> usize {
        let mut state = self.state();
        match state.subscribers.get_mut(order_id) {
            Some(publishers) => {
                publishers.retain(|publisher| !publisher.is_closed());
                publishers.len()
            }
            None => 0,
        }
    }

    pub fn fail_next(&self, operation: Operation, error: GatewayError) {
        self.state()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub fn gate(&self, operation: Operation) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.state()
            .gates
            .entry(operation)
            .or_default()
            .push_back(receiver);
        Gate(sender)
    }

    /// Moves an order to any status and broadcasts it.
    pub fn set_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<(), GatewayError> {
        let mut state = self.state();
        let patch = OrderPatch::status(status);
        state.order_mut(order_id)?.merge(patch.clone());
        info!(%order_id, %status, "Status set by staff");
        state.broadcast(order_id, &patch);
        Ok(())
    }

    /// Drops every push channel of an order, as a lost connection would.
    pub fn close_subscriptions(&self, order_id: &OrderId) {
        let closed = self.state().subscribers.remove(order_id);
        info!(
            %order_id,
            count = closed.map(|publishers| publishers.len()).unwrap_or(0),
            "Subscriptions closed"
        );
    }
}

#[async_trait]
impl OrderGateway for InMemoryBackend {
    async fn find_active_orders(&self, table_id: &TableId) -> Result<Vec<Order>, GatewayError> {
        self.enter(Operation::FindActiveOrders).await?;
        let found: Vec<Order> = self
            .state()
            .orders
            .iter()
            .filter(|order| {
                &order.table_id == table_id && OrderStatus::ACTIVE.contains(&order.status)
            })
            .cloned()
            .collect();
        debug!(%table_id, count = found.len(), "Find active orders");
        Ok(found)
    }

    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, GatewayError> {
        self.enter(Operation::FindOrder).await?;
        Ok(self.order(order_id))
    }

    async fn subscribe(
        &self,
        order_id: &OrderId,
    ) -> Result<Subscription<OrderPatch>, GatewayError> {
        self.enter(Operation::Subscribe).await?;
        let mut state = self.state();
        state.next_subscription += 1;
        let (publisher, subscription) =
            Subscription::channel(SubscriptionId(state.next_subscription));
        debug!(%order_id, subscription = %publisher.id(), "Subscribe");
        state
            .subscribers
            .entry(order_id.clone())
            .or_default()
            .push(publisher);
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) {
        let mut state = self.state();
        for publishers in state.subscribers.values_mut() {
            publishers.retain(|publisher| publisher.id() != subscription);
        }
        debug!(%subscription, "Unsubscribe");
    }

    async fn upsert_order_item(
        &self,
        request: UpsertItemRequest,
    ) -> Result<UpsertItemResponse, GatewayError> {
        self.enter(Operation::UpsertOrderItem).await?;
        let mut state = self.state();

        let order_id = match &request.order_id {
            Some(order_id) => order_id.clone(),
            None => match state.active_for(&request.table_id) {
                Some(existing) => existing.id.clone(),
                None => {
                    state.next_order += 1;
                    let mut order =
                        Order::new(format!("order_{}", state.next_order), request.table_id.clone());
                    order.restaurant_id = Some(request.restaurant_id.clone());
                    info!(order_id = %order.id, table_id = %order.table_id, "Order created");
                    let order_id = order.id.clone();
                    state.orders.push(order);
                    order_id
                }
            },
        };

        let order = state.order_mut(&order_id)?;
        if order.status != OrderStatus::Ordering {
            return Err(GatewayError::Validation(format!(
                "order {} is {} and no longer takes items",
                order_id, order.status
            )));
        }

        let item = request.item;
        let position = order
            .items
            .iter()
            .position(|line| line.product_id == item.product_id);
        match (position, item.quantity) {
            (Some(index), 0) => {
                order.items.remove(index);
            }
            (Some(index), _) => order.items[index] = item,
            (None, 0) => {}
            (None, _) => order.items.push(item),
        }
        let patch = OrderPatch::items(order.items.clone());
        order.merge(patch.clone());
        debug!(%order_id, total = %order.total, "Item upserted");

        state.broadcast(&order_id, &patch);
        Ok(UpsertItemResponse { order_id })
    }

    async fn transition_status(
        &self,
        request: StatusTransitionRequest,
    ) -> Result<(), GatewayError> {
        self.enter(Operation::TransitionStatus).await?;
        let mut state = self.state();
        let order = state.order_mut(&request.order_id)?;
        if !order.status.can_advance_to(request.new_status) {
            return Err(GatewayError::Validation(format!(
                "order {} cannot move from {} to {}",
                request.order_id, order.status, request.new_status
            )));
        }
        let patch = request.details.to_patch(request.new_status);
        order.merge(patch.clone());
        info!(order_id = %request.order_id, status = %request.new_status, "Status changed");

        state.broadcast(&request.order_id, &patch);
        Ok(())
    }

    async fn request_assistance(&self, request: AssistanceRequest) -> Result<(), GatewayError> {
        self.enter(Operation::RequestAssistance).await?;
        let mut state = self.state();
        state.order_mut(&request.order_id)?;
        info!(order_id = %request.order_id, details = %request.details, "Assistance requested");
        state.assistance.push(request);
        Ok(())
    }

    async fn submit_feedback(&self, request: FeedbackRequest) -> Result<(), GatewayError> {
        self.enter(Operation::SubmitFeedback).await?;
        if !(1..=5).contains(&request.rating) {
            return Err(GatewayError::Validation(format!(
                "rating {} is out of range",
                request.rating
            )));
        }
        let mut state = self.state();
        let order = state.order_mut(&request.order_id)?;
        order.rating = Some(request.rating);
        order.comment = request.comment.clone();
        info!(order_id = %request.order_id, rating = request.rating, "Feedback stored");
        state.feedback.push(request);
        Ok(())
    }
}
