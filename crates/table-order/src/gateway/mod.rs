//! # Remote Order Gateway
//!
//! The seam between the sync core and whatever backend stores the table's order. The core
//! only ever talks to an `Arc<dyn OrderGateway>`, so the backend can be a real service, the
//! [`InMemoryBackend`] or the expectation-driven [`MockGateway`].
//!
//! ## Contract
//!
//! - Lookups return raw records; the caller decides what "exactly one active order" means.
//! - Subscriptions deliver partial patches for one order id, in the order the backend
//!   applied them.
//! - Mutations either succeed or fail with a [`GatewayError`]. They never partially apply.

pub mod memory;
pub mod mock;

pub use memory::{Gate, InMemoryBackend, Operation};
pub use mock::{GatewayCall, MockGateway};

use crate::model::{
    LineItem, Order, OrderId, OrderPatch, OrderStatus, PaymentDetails, RestaurantId, TableId,
};
use async_trait::async_trait;
use replica_framework::{Subscription, SubscriptionId};
use serde::{Deserialize, Serialize};

/// Failures reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Rejected by backend: {0}")]
    Validation(String),
    #[error("Order not found: {0}")]
    NotFound(OrderId),
}

/// The full resulting line for one product, plus where it belongs.
///
/// `order_id` is absent when the device does not know of an order yet; the backend then
/// joins the table's active order or creates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertItemRequest {
    pub table_id: TableId,
    pub restaurant_id: RestaurantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub item: LineItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertItemResponse {
    pub order_id: OrderId,
}

/// Fields that travel with a status change and are written alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentDetails>,
}

impl StatusDetails {
    pub fn observations(observations: impl Into<String>) -> Self {
        Self {
            observations: Some(observations.into()),
            ..Default::default()
        }
    }

    pub fn payment(details: PaymentDetails) -> Self {
        Self {
            payment_details: Some(details),
            ..Default::default()
        }
    }

    /// `{status, ...details}` as a patch. The backend echoes exactly these fields.
    pub fn to_patch(&self, status: OrderStatus) -> OrderPatch {
        OrderPatch {
            status: Some(status),
            observations: self.observations.clone().map(Some),
            payment_details: self.payment_details.clone().map(Some),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransitionRequest {
    pub order_id: OrderId,
    pub new_status: OrderStatus,
    pub details: StatusDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistanceRequest {
    pub order_id: OrderId,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub order_id: OrderId,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Backend operations the sync core depends on.
#[async_trait]
pub trait OrderGateway: Send + Sync + 'static {
    /// Every order on the table whose status is one of [`OrderStatus::ACTIVE`].
    ///
    /// Returns all matches rather than the first one so that a broken at-most-one rule is
    /// visible to the caller.
    async fn find_active_orders(&self, table_id: &TableId) -> Result<Vec<Order>, GatewayError>;

    /// One order by id, whatever its status.
    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, GatewayError>;

    async fn subscribe(&self, order_id: &OrderId)
        -> Result<Subscription<OrderPatch>, GatewayError>;

    async fn unsubscribe(&self, subscription: SubscriptionId);

    async fn upsert_order_item(
        &self,
        request: UpsertItemRequest,
    ) -> Result<UpsertItemResponse, GatewayError>;

    async fn transition_status(&self, request: StatusTransitionRequest)
        -> Result<(), GatewayError>;

    async fn request_assistance(&self, request: AssistanceRequest) -> Result<(), GatewayError>;

    async fn submit_feedback(&self, request: FeedbackRequest) -> Result<(), GatewayError>;
}
