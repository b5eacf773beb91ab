//! Which screen a device shows, derived from the sync state and the checkout step.

use crate::checkout::CheckoutStep;
use crate::model::OrderStatus;
use crate::sync_actor::{SyncPhase, SyncState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Loading,
    /// Initialization failed; the message is shown with a retry.
    Failed(String),
    Menu,
    OrderStatus(OrderStatus),
    Tip,
    Payment,
    ProcessingPayment,
    Feedback,
}

impl Screen {
    pub fn resolve(state: &SyncState, step: &CheckoutStep) -> Self {
        match &state.phase {
            SyncPhase::Initializing => return Screen::Loading,
            SyncPhase::Failed(message) => return Screen::Failed(message.clone()),
            SyncPhase::Ready => {}
        }
        let status = match state.status() {
            None | Some(OrderStatus::Ordering) => return Screen::Menu,
            Some(OrderStatus::Paid) => return Screen::Feedback,
            Some(status) => status,
        };
        match step {
            CheckoutStep::Status => Screen::OrderStatus(status),
            CheckoutStep::Tip => Screen::Tip,
            CheckoutStep::Payment(_) => Screen::Payment,
            CheckoutStep::ProcessingPayment(_) => Screen::ProcessingPayment,
        }
    }
}
