//! # Order Sync Actor
//!
//! The single owner of this device's replica of the table order. Views never touch the
//! replica; they send [`SyncRequest`]s through an [`OrderSyncClient`] and read the
//! published [`SyncState`].

use super::error::{SyncError, ValidationError};
use super::messages::{QuantityChange, SyncRequest};
use super::state::{Ack, SyncPhase, SyncState};
use crate::clients::OrderSyncClient;
use crate::config::SessionConfig;
use crate::gateway::{
    AssistanceRequest, FeedbackRequest, GatewayError, OrderGateway, StatusDetails,
    StatusTransitionRequest, UpsertItemRequest, UpsertItemResponse,
};
use crate::model::{LineItem, Order, OrderId, OrderPatch, OrderStatus, Product, ProductId};
use replica_framework::{
    select_active, ActorHandle, Adoption, Epoch, FrameworkError, Replica, Response, Subscription,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

struct PendingUpsert {
    product: Product,
    change: QuantityChange,
    respond_to: Response<Ack, SyncError>,
}

/// A finished remote call, fed back into the actor loop.
enum Completion {
    Upsert {
        epoch: Epoch,
        product_id: ProductId,
        result: Result<UpsertItemResponse, GatewayError>,
        respond_to: Response<Ack, SyncError>,
    },
    Transition {
        epoch: Epoch,
        /// Status pushes merged before the call was issued.
        status_pushes: u64,
        patch: OrderPatch,
        result: Result<(), GatewayError>,
        respond_to: Response<Ack, SyncError>,
    },
    Feedback {
        result: Result<(), GatewayError>,
        respond_to: Response<Ack, SyncError>,
    },
}

/// The Order Synchronization Core of one device.
///
/// # Architecture Note
/// The actor owns the [`Replica`], the push [`Subscription`] and the per-product upsert
/// queues, and is the only code that mutates them. Its loop waits on three sources:
///
/// 1. **Pushes** from the subscription, merged in delivery order.
/// 2. **Completions** of remote calls it spawned, checked against the epoch they were
///    issued under and discarded when stale.
/// 3. **Requests** from clients.
///
/// The select is biased in that order, so a push that is already buffered is merged before
/// the response of the call that caused it.
///
/// **Write paths**:
/// Item upserts are confirmed by the echo: a successful response changes nothing locally
/// except the order identity. Status transitions are applied as soon as the backend accepts
/// them, unless a status push was merged while the call was out, since that push is newer.
/// Lookups and subscription changes run inline, so requests that arrive meanwhile wait in the
/// channel and always see a settled identity.
pub struct OrderSyncActor {
    config: SessionConfig,
    gateway: Arc<dyn OrderGateway>,
    receiver: mpsc::Receiver<SyncRequest>,
    completions: mpsc::UnboundedReceiver<Completion>,
    completion_sender: mpsc::UnboundedSender<Completion>,
    replica: Replica<Order>,
    subscription: Option<Subscription<OrderPatch>>,
    /// A key means an upsert for that product is in flight; the value is what waits behind it.
    queued: HashMap<ProductId, VecDeque<PendingUpsert>>,
    in_flight: usize,
    /// Pushes carrying a status, counted so an accepted transition never overwrites a newer one.
    status_pushes: u64,
    phase: SyncPhase,
    resync_attempts: u32,
    state: watch::Sender<SyncState>,
}

impl OrderSyncActor {
    /// Creates the actor and the client that talks to it.
    ///
    /// The actor does nothing until it is spawned with [`run`](Self::run) and asked to
    /// initialize.
    pub fn new(config: SessionConfig, gateway: Arc<dyn OrderGateway>) -> (Self, OrderSyncClient) {
        let (handle, receiver) = ActorHandle::channel(config.request_buffer);
        let (completion_sender, completions) = mpsc::unbounded_channel();
        let (state, state_receiver) = watch::channel(SyncState::default());
        let actor = Self {
            config,
            gateway,
            receiver,
            completions,
            completion_sender,
            replica: Replica::new(),
            subscription: None,
            queued: HashMap::new(),
            in_flight: 0,
            status_pushes: 0,
            phase: SyncPhase::Initializing,
            resync_attempts: 0,
            state,
        };
        (actor, OrderSyncClient::new(handle, state_receiver))
    }

    /// Runs the event loop until every client is gone or a shutdown is requested.
    pub async fn run(mut self) {
        info!(table_id = %self.config.table_id, "Order sync actor started");

        loop {
            tokio::select! {
                biased;
                update = next_update(&mut self.subscription) => match update {
                    Some(patch) => self.apply_push(patch),
                    None => self.on_channel_lost().await,
                },
                Some(completion) = self.completions.recv() => {
                    self.handle_completion(completion).await;
                }
                request = self.receiver.recv() => match request {
                    Some(SyncRequest::Shutdown) | None => break,
                    Some(request) => self.handle_request(request).await,
                },
            }
        }

        self.teardown_subscription().await;
        info!(table_id = %self.config.table_id, "Order sync actor stopped");
    }

    async fn handle_request(&mut self, request: SyncRequest) {
        match request {
            SyncRequest::Initialize { respond_to } => {
                let result = self.initialize().await;
                let _ = respond_to.send(result);
            }
            SyncRequest::UpsertItem {
                product,
                change,
                respond_to,
            } => self.enqueue_upsert(PendingUpsert {
                product,
                change,
                respond_to,
            }),
            SyncRequest::Transition {
                status,
                details,
                respond_to,
            } => self.start_transition(status, details, respond_to),
            SyncRequest::RequestAssistance {
                details,
                respond_to,
            } => self.start_assistance(details, respond_to),
            SyncRequest::SubmitFeedback {
                rating,
                comment,
                respond_to,
            } => self.start_feedback(rating, comment, respond_to),
            SyncRequest::Resync { respond_to } => {
                let result = self.resync().await;
                let _ = respond_to.send(result);
            }
            SyncRequest::Reset { respond_to } => {
                info!(order_id = ?self.replica.id(), "Reset");
                self.drop_order().await;
                self.publish();
                let _ = respond_to.send(Ok(()));
            }
            SyncRequest::Shutdown => {}
        }
    }

    async fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Upsert {
                epoch,
                product_id,
                result,
                respond_to,
            } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                if !self.replica.is_current(epoch) {
                    debug!(%product_id, %epoch, "Stale upsert response discarded");
                    self.publish();
                    let _ = respond_to.send(Ok(Ack::Stale));
                    return;
                }
                let outcome = match result {
                    Ok(response) => {
                        self.on_upsert_accepted(response.order_id).await;
                        Ok(Ack::Applied)
                    }
                    Err(e) => {
                        warn!(%product_id, error = %e, "Upsert failed");
                        Err(SyncError::Gateway(e))
                    }
                };
                self.start_next_for(&product_id);
                self.publish();
                let _ = respond_to.send(outcome);
            }
            Completion::Transition {
                epoch,
                status_pushes,
                patch,
                result,
                respond_to,
            } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                let outcome = if !self.replica.is_current(epoch) {
                    debug!(%epoch, "Stale transition response discarded");
                    Ok(Ack::Stale)
                } else {
                    match result {
                        Ok(()) if self.status_pushes != status_pushes => {
                            debug!(
                                order_id = ?self.replica.id(),
                                status = ?patch.status,
                                "Status already pushed, accepted transition not merged"
                            );
                            Ok(Ack::Applied)
                        }
                        Ok(()) => {
                            info!(order_id = ?self.replica.id(), status = ?patch.status, "Status changed");
                            self.replica.merge(patch);
                            Ok(Ack::Applied)
                        }
                        Err(e) => {
                            warn!(error = %e, "Status transition failed");
                            Err(SyncError::Gateway(e))
                        }
                    }
                };
                self.publish();
                let _ = respond_to.send(outcome);
            }
            Completion::Feedback { result, respond_to } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                let outcome = match result {
                    Ok(()) => Ok(Ack::Applied),
                    Err(e) => {
                        warn!(error = %e, "Feedback failed");
                        Err(SyncError::Gateway(e))
                    }
                };
                self.publish();
                let _ = respond_to.send(outcome);
            }
        }
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    async fn initialize(&mut self) -> Result<Option<OrderId>, SyncError> {
        self.drop_order().await;
        self.phase = SyncPhase::Initializing;
        self.publish();

        let result = self.lookup_active().await.map_err(|e| match e {
            SyncError::Gateway(e) => SyncError::InitializationFailed(e),
            other => other,
        });
        match &result {
            Ok(order_id) => {
                info!(table_id = %self.config.table_id, ?order_id, "Initialized");
                self.phase = SyncPhase::Ready;
            }
            Err(e) => {
                warn!(table_id = %self.config.table_id, error = %e, "Initialization failed");
                self.drop_order().await;
                self.phase = SyncPhase::Failed(e.to_string());
            }
        }
        self.publish();
        result
    }

    /// Adopts the table's single active order, if there is one.
    async fn lookup_active(&mut self) -> Result<Option<OrderId>, SyncError> {
        let orders = self
            .gateway
            .find_active_orders(&self.config.table_id)
            .await?;
        let active = select_active(orders).map_err(|e| match e {
            FrameworkError::AmbiguousReplica { count } => SyncError::AmbiguousActiveOrder { count },
            other => SyncError::Framework(other),
        })?;
        match active {
            Some(order) => {
                let order_id = order.id.clone();
                self.adopt(order).await?;
                Ok(Some(order_id))
            }
            None => Ok(None),
        }
    }

    /// Installs a full record and makes sure its subscription is open.
    async fn adopt(&mut self, order: Order) -> Result<(), GatewayError> {
        let order_id = order.id.clone();
        match self.replica.adopt(order) {
            Adoption::Fresh => info!(%order_id, "Active order adopted"),
            Adoption::Refreshed => debug!(%order_id, "Active order refreshed"),
            Adoption::Replaced => {
                info!(%order_id, "Active order replaced");
                self.abandon_queued();
                self.teardown_subscription().await;
            }
        }
        self.ensure_subscribed().await
    }

    /// A mutation response named an order. Takes it over unless it is already current.
    async fn on_upsert_accepted(&mut self, order_id: OrderId) {
        let known = self.replica.id().cloned();
        if known.as_ref() == Some(&order_id) {
            return;
        }
        if let Some(known) = known {
            warn!(%known, %order_id, "Backend answered for a different order");
        }

        // The creation is not pushed, so read the record once the channel is open.
        let mut placeholder = Order::new(order_id.clone(), self.config.table_id.clone());
        placeholder.restaurant_id = Some(self.config.restaurant_id.clone());
        if let Err(e) = self.adopt(placeholder).await {
            warn!(%order_id, error = %e, "Subscribing to the new order failed");
        }
        match self.gateway.find_order(&order_id).await {
            Ok(Some(order)) => {
                self.replica.adopt(order);
            }
            Ok(None) => warn!(%order_id, "New order not found"),
            Err(e) => warn!(%order_id, error = %e, "Reading the new order failed"),
        }
    }

    async fn resync(&mut self) -> Result<Option<OrderId>, SyncError> {
        self.ensure_ready()?;
        self.resync_attempts = 0;
        let result = self.refresh().await;
        if let Err(e) = &result {
            warn!(error = %e, "Re-sync failed");
        }
        self.publish();
        result
    }

    /// Reopens the subscription if needed, then re-reads the order it covers.
    async fn refresh(&mut self) -> Result<Option<OrderId>, SyncError> {
        let Some(order_id) = self.replica.id().cloned() else {
            return self.lookup_active().await;
        };
        self.ensure_subscribed().await?;
        match self.gateway.find_order(&order_id).await? {
            Some(order) => {
                self.adopt(order).await?;
                Ok(Some(order_id))
            }
            None => {
                warn!(%order_id, "Order no longer exists");
                self.drop_order().await;
                Ok(None)
            }
        }
    }

    async fn drop_order(&mut self) {
        self.replica.clear();
        self.teardown_subscription().await;
        self.abandon_queued();
        self.resync_attempts = 0;
    }

    // =========================================================================
    // SUBSCRIPTION
    // =========================================================================

    async fn ensure_subscribed(&mut self) -> Result<(), GatewayError> {
        if self.subscription.is_some() {
            return Ok(());
        }
        let Some(order_id) = self.replica.id().cloned() else {
            return Ok(());
        };
        let subscription = self.gateway.subscribe(&order_id).await?;
        debug!(%order_id, subscription = %subscription.id(), "Subscribed");
        self.subscription = Some(subscription);
        Ok(())
    }

    async fn teardown_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            debug!(subscription = %subscription.id(), "Unsubscribe");
            self.gateway.unsubscribe(subscription.id()).await;
        }
    }

    fn apply_push(&mut self, patch: OrderPatch) {
        self.resync_attempts = 0;
        if let Some(status) = patch.status {
            self.status_pushes += 1;
            info!(order_id = ?self.replica.id(), %status, "Status pushed");
        }
        debug!(?patch, "Push");
        if self.replica.merge(patch) {
            self.publish();
        }
    }

    /// Applies every push that has already arrived.
    fn drain_pushes(&mut self) {
        while let Some(patch) = self.subscription.as_mut().and_then(Subscription::try_recv) {
            self.apply_push(patch);
        }
    }

    async fn on_channel_lost(&mut self) {
        if let Some(lost) = self.subscription.take() {
            warn!(order_id = ?self.replica.id(), subscription = %lost.id(), "Push channel closed");
            self.gateway.unsubscribe(lost.id()).await;
        }
        if !self.config.resync_on_channel_loss
            || self.resync_attempts >= self.config.max_resync_attempts
        {
            warn!(attempts = self.resync_attempts, "Push channel left closed");
            self.publish();
            return;
        }

        self.resync_attempts += 1;
        info!(attempt = self.resync_attempts, "Re-syncing after channel loss");
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Re-sync failed");
        }
        self.publish();
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    fn ensure_ready(&self) -> Result<(), SyncError> {
        match self.phase {
            SyncPhase::Ready => Ok(()),
            _ => Err(SyncError::SessionUnavailable),
        }
    }

    fn active_order(&self) -> Result<&Order, SyncError> {
        self.ensure_ready()?;
        self.replica.get().ok_or(SyncError::NoActiveOrder)
    }

    fn enqueue_upsert(&mut self, pending: PendingUpsert) {
        if let Err(e) = self.ensure_ready() {
            let _ = pending.respond_to.send(Err(e));
            return;
        }
        match self.queued.get_mut(&pending.product.id) {
            Some(queue) => {
                debug!(product_id = %pending.product.id, waiting = queue.len() + 1, "Upsert queued");
                queue.push_back(pending);
            }
            None => {
                self.start_upsert(pending);
            }
        }
    }

    /// Issues the upsert. Returns `false` when it was rejected locally instead.
    fn start_upsert(&mut self, pending: PendingUpsert) -> bool {
        let PendingUpsert {
            product,
            change,
            respond_to,
        } = pending;

        let current = self.replica.get();
        if let Some(order) = current.filter(|order| order.status != OrderStatus::Ordering) {
            let _ = respond_to.send(Err(ValidationError::NotTakingItems(order.status).into()));
            return false;
        }
        let existing = current.and_then(|order| order.item(&product.id));
        let Some(quantity) = change.resolve(existing.map(|line| line.quantity)) else {
            let _ = respond_to.send(Err(ValidationError::ItemNotInOrder(product.id).into()));
            return false;
        };
        let item = match existing {
            Some(line) => LineItem {
                quantity,
                ..line.clone()
            },
            None => product.line(quantity),
        };
        let request = UpsertItemRequest {
            table_id: self.config.table_id.clone(),
            restaurant_id: self.config.restaurant_id.clone(),
            order_id: self.replica.id().cloned(),
            item,
        };

        let epoch = self.replica.epoch();
        let product_id = product.id;
        debug!(%product_id, quantity, order_id = ?request.order_id, %epoch, "Upsert item");
        self.queued.entry(product_id.clone()).or_default();
        self.in_flight += 1;
        self.publish();

        let gateway = self.gateway.clone();
        let completions = self.completion_sender.clone();
        tokio::spawn(async move {
            let result = gateway.upsert_order_item(request).await;
            let _ = completions.send(Completion::Upsert {
                epoch,
                product_id,
                result,
                respond_to,
            });
        });
        true
    }

    /// Starts the next queued upsert for a product, or marks the product idle.
    fn start_next_for(&mut self, product_id: &ProductId) {
        self.drain_pushes();
        loop {
            let next = self.queued.get_mut(product_id).and_then(VecDeque::pop_front);
            match next {
                Some(pending) => {
                    if self.start_upsert(pending) {
                        return;
                    }
                }
                None => {
                    self.queued.remove(product_id);
                    return;
                }
            }
        }
    }

    /// Answers every queued upsert as stale. In-flight ones are caught by their epoch.
    fn abandon_queued(&mut self) {
        for (product_id, queue) in self.queued.drain() {
            for pending in queue {
                debug!(%product_id, "Queued upsert dropped");
                let _ = pending.respond_to.send(Ok(Ack::Stale));
            }
        }
    }

    fn start_transition(
        &mut self,
        status: OrderStatus,
        details: StatusDetails,
        respond_to: Response<Ack, SyncError>,
    ) {
        let order = match self.active_order() {
            Ok(order) => order,
            Err(e) => {
                let _ = respond_to.send(Err(e));
                return;
            }
        };
        if !order.status.can_advance_to(status) {
            let error = ValidationError::IllegalTransition {
                from: order.status,
                to: status,
            };
            let _ = respond_to.send(Err(error.into()));
            return;
        }

        let request = StatusTransitionRequest {
            order_id: order.id.clone(),
            new_status: status,
            details,
        };
        let patch = request.details.to_patch(status);
        let epoch = self.replica.epoch();
        let status_pushes = self.status_pushes;
        debug!(order_id = %request.order_id, %status, details = ?request.details, "Transition");
        self.in_flight += 1;
        self.publish();

        let gateway = self.gateway.clone();
        let completions = self.completion_sender.clone();
        tokio::spawn(async move {
            let result = gateway.transition_status(request).await;
            let _ = completions.send(Completion::Transition {
                epoch,
                status_pushes,
                patch,
                result,
                respond_to,
            });
        });
    }

    fn start_feedback(
        &mut self,
        rating: u8,
        comment: Option<String>,
        respond_to: Response<Ack, SyncError>,
    ) {
        if !(1..=5).contains(&rating) {
            let _ = respond_to.send(Err(ValidationError::RatingOutOfRange(rating).into()));
            return;
        }
        let order_id = match self.active_order() {
            Ok(order) => order.id.clone(),
            Err(e) => {
                let _ = respond_to.send(Err(e));
                return;
            }
        };
        let request = FeedbackRequest {
            order_id,
            rating,
            comment: comment.filter(|comment| !comment.trim().is_empty()),
        };
        debug!(order_id = %request.order_id, rating, "Submit feedback");
        self.in_flight += 1;
        self.publish();

        let gateway = self.gateway.clone();
        let completions = self.completion_sender.clone();
        tokio::spawn(async move {
            let result = gateway.submit_feedback(request).await;
            let _ = completions.send(Completion::Feedback { result, respond_to });
        });
    }

    /// Fire-and-forget: answered straight from the spawned task, never touches the replica.
    fn start_assistance(&mut self, details: String, respond_to: Response<(), SyncError>) {
        let details = details.trim().to_string();
        if details.is_empty() {
            let _ = respond_to.send(Err(ValidationError::EmptyAssistanceDetails.into()));
            return;
        }
        let order_id = match self.active_order() {
            Ok(order) => order.id.clone(),
            Err(e) => {
                let _ = respond_to.send(Err(e));
                return;
            }
        };
        debug!(%order_id, %details, "Request assistance");

        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            let result = gateway
                .request_assistance(AssistanceRequest { order_id, details })
                .await
                .map_err(SyncError::from);
            if let Err(e) = &result {
                warn!(error = %e, "Assistance request failed");
            }
            let _ = respond_to.send(result);
        });
    }

    fn publish(&self) {
        self.state.send_replace(SyncState {
            phase: self.phase.clone(),
            order: self.replica.get().cloned(),
            processing: self.in_flight > 0,
            subscribed: self.subscription.is_some(),
        });
    }
}

/// Next push, `None` once the channel has closed. Never resolves without a subscription.
async fn next_update(subscription: &mut Option<Subscription<OrderPatch>>) -> Option<OrderPatch> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
