//! # Order Sync Client
//!
//! The handle the views receive for the table's sync core. It is cheap to clone, and every
//! clone talks to the same actor.
use crate::gateway::StatusDetails;
use crate::model::{Order, OrderId, OrderStatus, Product};
use crate::sync_actor::{Ack, QuantityChange, SyncError, SyncRequest, SyncState};
use replica_framework::{ActorHandle, FrameworkError};
use tokio::sync::watch;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct OrderSyncClient {
    handle: ActorHandle<SyncRequest>,
    state: watch::Receiver<SyncState>,
}

impl OrderSyncClient {
    pub fn new(handle: ActorHandle<SyncRequest>, state: watch::Receiver<SyncState>) -> Self {
        Self { handle, state }
    }

    /// Drops any current order and looks up the table's active one.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<Option<OrderId>, SyncError> {
        self.handle
            .call(|respond_to| SyncRequest::Initialize { respond_to })
            .await
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn upsert_item(
        &self,
        product: Product,
        change: QuantityChange,
    ) -> Result<Ack, SyncError> {
        debug!(?change, "upsert_item called");
        self.handle
            .call(|respond_to| SyncRequest::UpsertItem {
                product,
                change,
                respond_to,
            })
            .await
    }

    /// One more of `product`, creating the line if needed.
    pub async fn add_item(&self, product: Product) -> Result<Ack, SyncError> {
        self.upsert_item(product, QuantityChange::Delta(1)).await
    }

    #[instrument(skip(self, details))]
    pub async fn transition(
        &self,
        status: OrderStatus,
        details: StatusDetails,
    ) -> Result<Ack, SyncError> {
        self.handle
            .call(|respond_to| SyncRequest::Transition {
                status,
                details,
                respond_to,
            })
            .await
    }

    pub async fn request_bill(&self) -> Result<Ack, SyncError> {
        self.transition(OrderStatus::BillRequested, StatusDetails::default())
            .await
    }

    #[instrument(skip(self, details))]
    pub async fn request_assistance(&self, details: impl Into<String>) -> Result<(), SyncError> {
        let details = details.into();
        self.handle
            .call(|respond_to| SyncRequest::RequestAssistance {
                details,
                respond_to,
            })
            .await
    }

    #[instrument(skip(self, comment))]
    pub async fn submit_feedback(
        &self,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Ack, SyncError> {
        self.handle
            .call(|respond_to| SyncRequest::SubmitFeedback {
                rating,
                comment,
                respond_to,
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn resync(&self) -> Result<Option<OrderId>, SyncError> {
        self.handle
            .call(|respond_to| SyncRequest::Resync { respond_to })
            .await
    }

    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<(), SyncError> {
        self.handle
            .call(|respond_to| SyncRequest::Reset { respond_to })
            .await
    }

    /// Asks the actor to stop even while other clients are alive.
    pub async fn shutdown(&self) {
        let _ = self.handle.send(SyncRequest::Shutdown).await;
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn order(&self) -> Option<Order> {
        self.state.borrow().order.clone()
    }

    pub fn active_order_id(&self) -> Option<OrderId> {
        self.state.borrow().order_id().cloned()
    }

    pub fn is_processing(&self) -> bool {
        self.state.borrow().processing
    }

    /// A receiver that is notified on every published change.
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Waits until the published state satisfies `predicate` and returns that state.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SyncState) -> bool,
    ) -> Result<SyncState, SyncError> {
        let mut receiver = self.state.clone();
        let state = receiver
            .wait_for(predicate)
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        let snapshot = state.clone();
        Ok(snapshot)
    }
}
