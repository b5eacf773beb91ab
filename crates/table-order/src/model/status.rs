use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an order stands in its lifecycle.
///
/// ```text
/// ordering → received → ready_for_pickup → served → bill_requested
///          → {waiting_for_pos | cash_payment_pending} → paid
/// ```
///
/// The progression is not a total order: the bill may be requested from any status between
/// `received` and `served`, and the two payment statuses are alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Ordering,
    Received,
    ReadyForPickup,
    Served,
    BillRequested,
    WaitingForPos,
    CashPaymentPending,
    Paid,
}

impl OrderStatus {
    /// Every status that still counts as an active order, used as the lookup filter.
    pub const ACTIVE: [OrderStatus; 7] = [
        OrderStatus::Ordering,
        OrderStatus::Received,
        OrderStatus::ReadyForPickup,
        OrderStatus::Served,
        OrderStatus::BillRequested,
        OrderStatus::WaitingForPos,
        OrderStatus::CashPaymentPending,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Whether `next` is a legal forward step from `self`.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Ordering, Received)
                | (Received, ReadyForPickup)
                | (ReadyForPickup, Served)
                | (Received | ReadyForPickup | Served, BillRequested)
                | (BillRequested, WaitingForPos | CashPaymentPending)
                | (WaitingForPos | CashPaymentPending, Paid)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Ordering => "ordering",
            OrderStatus::Received => "received",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::Served => "served",
            OrderStatus::BillRequested => "bill_requested",
            OrderStatus::WaitingForPos => "waiting_for_pos",
            OrderStatus::CashPaymentPending => "cash_payment_pending",
            OrderStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
