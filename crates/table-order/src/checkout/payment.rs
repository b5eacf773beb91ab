use super::tip::round_money;
use crate::model::{PaymentDetails, PaymentMethod};
use crate::sync_actor::ValidationError;
use rust_decimal::Decimal;

/// Step of the cash stepper.
pub const CASH_STEP: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// What the diner is about to pay. Lives from the tip step until payment is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub subtotal: Decimal,
    pub tip_amount: Decimal,
    pub final_total: Decimal,
    pub method: Option<PaymentMethod>,
}

impl PaymentIntent {
    pub fn new(subtotal: Decimal, tip_amount: Decimal) -> Self {
        Self {
            subtotal,
            tip_amount,
            final_total: round_money(subtotal + tip_amount),
            method: None,
        }
    }

    /// Details for a card payment: no tendered amount, no change.
    pub fn card_details(&self) -> PaymentDetails {
        PaymentDetails {
            method: PaymentMethod::Card,
            tip_amount: self.tip_amount,
            final_total: self.final_total,
            amount_received: None,
            change: None,
        }
    }

    /// Details for a cash payment, rejected when the diner hands over too little.
    pub fn cash_details(&self, tendered: Decimal) -> Result<PaymentDetails, ValidationError> {
        if tendered < self.final_total {
            return Err(ValidationError::InsufficientCash {
                tendered,
                total: self.final_total,
            });
        }
        Ok(PaymentDetails {
            method: PaymentMethod::Cash,
            tip_amount: self.tip_amount,
            final_total: self.final_total,
            amount_received: Some(tendered),
            change: Some(tendered - self.final_total),
        })
    }
}

/// The amount entered on the cash step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CashTender {
    amount: Decimal,
}

impl CashTender {
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount: amount.max(Decimal::ZERO),
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn step_up(&mut self) {
        self.amount += CASH_STEP;
    }

    pub fn step_down(&mut self) {
        self.amount = (self.amount - CASH_STEP).max(Decimal::ZERO);
    }

    pub fn covers(&self, intent: &PaymentIntent) -> bool {
        self.amount >= intent.final_total
    }
}
