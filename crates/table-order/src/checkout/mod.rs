//! # Checkout Flow Controller
//!
//! A per-device state machine layered on top of the synchronized order. It never writes the
//! order directly: payment goes through the sync core as a status transition, and the flow
//! follows whatever status the core publishes.
//!
//! ```text
//!            bill_requested               tip confirmed             payment accepted
//!   Status ─────────────────▶ Tip ───────────────────▶ Payment ───────────────────▶ ProcessingPayment
//!     ▲                        │                          │                               │
//!     └────────────────────────┴──────────────────────────┴───────────────────────────────┘
//!                        status is no longer bill_requested (forced reset)
//! ```
//!
//! Every step operation first catches up with the status the core last published, so a
//! staff override resets the flow even when nobody called [`CheckoutFlow::sync`].
//!
//! Once the order is `paid` the device shows feedback capture. Submitting or skipping it
//! resets the core, and the table is free for a new order.

pub mod payment;
pub mod tip;

pub use payment::{CashTender, PaymentIntent, CASH_STEP};
pub use tip::{tip_options, TipChoice, TipOption};

use crate::clients::OrderSyncClient;
use crate::gateway::StatusDetails;
use crate::model::{OrderStatus, PaymentDetails};
use crate::sync_actor::{Ack, SyncError, ValidationError};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStep {
    /// Mirrors the order's progress.
    Status,
    Tip,
    Payment(PaymentIntent),
    ProcessingPayment(PaymentIntent),
}

impl CheckoutStep {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutStep::Status => "status",
            CheckoutStep::Tip => "tip",
            CheckoutStep::Payment(_) => "payment",
            CheckoutStep::ProcessingPayment(_) => "processing_payment",
        }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CheckoutError {
    #[error("Checkout is at {actual}, expected {expected}")]
    WrongStep {
        expected: &'static str,
        actual: &'static str,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl CheckoutError {
    /// Whether the same action may succeed if tried again.
    pub fn is_retryable(&self) -> bool {
        match self {
            CheckoutError::Sync(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub struct CheckoutFlow {
    core: OrderSyncClient,
    step: CheckoutStep,
    tip_presets: Vec<u32>,
}

impl CheckoutFlow {
    pub fn new(core: OrderSyncClient, tip_presets: Vec<u32>) -> Self {
        Self {
            core,
            step: CheckoutStep::Status,
            tip_presets,
        }
    }

    pub fn step(&self) -> &CheckoutStep {
        &self.step
    }

    pub fn intent(&self) -> Option<&PaymentIntent> {
        match &self.step {
            CheckoutStep::Payment(intent) | CheckoutStep::ProcessingPayment(intent) => Some(intent),
            _ => None,
        }
    }

    /// Applies the automatic transitions for an observed order status.
    pub fn observe(&mut self, status: Option<OrderStatus>) -> &CheckoutStep {
        let bill_requested = status == Some(OrderStatus::BillRequested);
        let at_status = matches!(self.step, CheckoutStep::Status);
        if at_status && bill_requested {
            info!("Bill requested, showing tip step");
            self.step = CheckoutStep::Tip;
        } else if !at_status && !bill_requested {
            warn!(step = self.step.name(), ?status, "Order left bill_requested, checkout reset");
            self.step = CheckoutStep::Status;
        }
        &self.step
    }

    /// [`observe`](Self::observe) with the status the core last published.
    pub fn sync(&mut self) -> &CheckoutStep {
        let status = self.core.state().status();
        self.observe(status)
    }

    fn subtotal(&self) -> Result<Decimal, SyncError> {
        self.core
            .order()
            .map(|order| order.total)
            .ok_or(SyncError::NoActiveOrder)
    }

    /// The preset buttons for the current subtotal.
    pub fn tip_options(&mut self) -> Result<Vec<TipOption>, CheckoutError> {
        self.sync();
        self.expect_step("tip", |step| matches!(step, CheckoutStep::Tip))?;
        Ok(tip_options(self.subtotal()?, &self.tip_presets))
    }

    /// Leaves the tip step with a payment intent of subtotal + tip.
    #[instrument(skip(self))]
    pub fn confirm_tip(&mut self, choice: TipChoice) -> Result<PaymentIntent, CheckoutError> {
        self.sync();
        self.expect_step("tip", |step| matches!(step, CheckoutStep::Tip))?;
        let subtotal = self.subtotal()?;
        let tip_amount = choice.amount(subtotal)?;
        let intent = PaymentIntent::new(subtotal, tip_amount);
        debug!(%subtotal, %tip_amount, final_total = %intent.final_total, "Tip confirmed");
        self.step = CheckoutStep::Payment(intent.clone());
        Ok(intent)
    }

    /// Pays in cash. Too little cash is rejected here, without a remote call.
    #[instrument(skip(self))]
    pub async fn pay_with_cash(&mut self, tendered: Decimal) -> Result<Ack, CheckoutError> {
        let intent = self.payment_intent()?;
        let details = intent.cash_details(tendered)?;
        self.submit_payment(intent, details, OrderStatus::CashPaymentPending)
            .await
    }

    #[instrument(skip(self))]
    pub async fn pay_with_card(&mut self) -> Result<Ack, CheckoutError> {
        let intent = self.payment_intent()?;
        let details = intent.card_details();
        self.submit_payment(intent, details, OrderStatus::WaitingForPos)
            .await
    }

    async fn submit_payment(
        &mut self,
        mut intent: PaymentIntent,
        details: PaymentDetails,
        status: OrderStatus,
    ) -> Result<Ack, CheckoutError> {
        let method = details.method;
        let ack = self
            .core
            .transition(status, StatusDetails::payment(details))
            .await?;
        if ack == Ack::Applied {
            info!(%method, final_total = %intent.final_total, "Payment submitted");
            intent.method = Some(method);
            self.step = CheckoutStep::ProcessingPayment(intent);
        }
        Ok(ack)
    }

    /// Captures feedback for a paid order, then frees the table.
    #[instrument(skip(self, comment))]
    pub async fn submit_feedback(
        &mut self,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Ack, CheckoutError> {
        let ack = self.core.submit_feedback(rating, comment).await?;
        self.finish().await?;
        Ok(ack)
    }

    pub async fn skip_feedback(&mut self) -> Result<(), CheckoutError> {
        self.finish().await
    }

    async fn finish(&mut self) -> Result<(), CheckoutError> {
        self.core.reset().await?;
        self.step = CheckoutStep::Status;
        Ok(())
    }

    /// The intent of the payment step, after catching up with the published status.
    fn payment_intent(&mut self) -> Result<PaymentIntent, CheckoutError> {
        self.sync();
        match &self.step {
            CheckoutStep::Payment(intent) => Ok(intent.clone()),
            other => Err(CheckoutError::WrongStep {
                expected: "payment",
                actual: other.name(),
            }),
        }
    }

    fn expect_step(
        &self,
        expected: &'static str,
        is_expected: impl Fn(&CheckoutStep) -> bool,
    ) -> Result<(), CheckoutError> {
        if is_expected(&self.step) {
            Ok(())
        } else {
            Err(CheckoutError::WrongStep {
                expected,
                actual: self.step.name(),
            })
        }
    }
}
