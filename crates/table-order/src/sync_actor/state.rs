use crate::model::{Order, OrderId, OrderStatus};

/// Where the core is in establishing the table's order identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    Initializing,
    Ready,
    /// The lookup failed. Mutations are refused until `initialize` is called again.
    Failed(String),
}

/// What the core publishes to the views after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub phase: SyncPhase,
    pub order: Option<Order>,
    /// At least one mutation is waiting for the backend.
    pub processing: bool,
    pub subscribed: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            phase: SyncPhase::Initializing,
            order: None,
            processing: false,
            subscribed: false,
        }
    }
}

impl SyncState {
    pub fn order_id(&self) -> Option<&OrderId> {
        self.order.as_ref().map(|order| &order.id)
    }

    pub fn status(&self) -> Option<OrderStatus> {
        self.order.as_ref().map(|order| order.status)
    }

    pub fn is_ready(&self) -> bool {
        self.phase == SyncPhase::Ready
    }
}

/// Outcome of a mutation that reached the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Applied,
    /// The order was reset or replaced while the call was in flight; the answer was dropped.
    Stale,
}
