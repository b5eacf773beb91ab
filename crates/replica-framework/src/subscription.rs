//! # Change Subscriptions
//!
//! A subscription is the push channel a backend hands out for one record id. Patches are
//! delivered in the order the backend applied them; the receiving actor must apply them in
//! that order and must not coalesce them.
//!
//! The channel is unbounded on purpose: publishers are usually called while the backend
//! holds its own state lock and must never wait on a slow subscriber.

use std::fmt;
use tokio::sync::mpsc;

/// Identifies a subscription so the backend can tear it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl From<u64> for SubscriptionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

/// Backend side of a subscription.
#[derive(Debug, Clone)]
pub struct Publisher<P> {
    id: SubscriptionId,
    sender: mpsc::UnboundedSender<P>,
}

impl<P> Publisher<P> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Delivers a patch. Returns `false` once the subscriber is gone.
    pub fn publish(&self, patch: P) -> bool {
        self.sender.send(patch).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Client side of a subscription, exclusively owned by the replica actor.
#[derive(Debug)]
pub struct Subscription<P> {
    id: SubscriptionId,
    updates: mpsc::UnboundedReceiver<P>,
}

impl<P> Subscription<P> {
    /// Creates a connected publisher/subscription pair.
    pub fn channel(id: SubscriptionId) -> (Publisher<P>, Subscription<P>) {
        let (sender, updates) = mpsc::unbounded_channel();
        (Publisher { id, sender }, Subscription { id, updates })
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next patch, or `None` once every publisher for this id has been dropped.
    pub async fn recv(&mut self) -> Option<P> {
        self.updates.recv().await
    }

    /// A patch that has already been delivered, without waiting.
    pub fn try_recv(&mut self) -> Option<P> {
        self.updates.try_recv().ok()
    }
}
