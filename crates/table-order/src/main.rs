//! # Table Order Demo
//!
//! Two diners share one table against an in-process backend and walk an order from the first
//! item to the feedback screen:
//!
//! 1. Both devices start a [`TableSession`]; the table has no order yet.
//! 2. Alice's first item creates the order, Bob joins it and adds his own.
//! 3. Alice places the order, staff move it along, Bob asks for napkins and the bill.
//! 4. Alice tips, pays by card, staff confirm, both devices land on feedback.
//!
//! Run with `RUST_LOG=info` (or `debug` for every push).

use replica_framework::tracing::setup_tracing;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use table_order::assistance::AssistanceTopic;
use table_order::checkout::TipChoice;
use table_order::clients::OrderSyncClient;
use table_order::config::SessionConfig;
use table_order::gateway::{InMemoryBackend, OrderGateway};
use table_order::lifecycle::TableSession;
use table_order::model::{OrderStatus, Product};
use table_order::screen::Screen;
use table_order::sync_actor::SyncState;
use tracing::{info, info_span, warn, Instrument};

type DemoResult<T> = Result<T, Box<dyn std::error::Error>>;

const WAIT: Duration = Duration::from_secs(2);

async fn wait_until(
    client: &OrderSyncClient,
    predicate: impl FnMut(&SyncState) -> bool,
) -> DemoResult<SyncState> {
    Ok(tokio::time::timeout(WAIT, client.wait_for(predicate)).await??)
}

async fn wait_for_status(client: &OrderSyncClient, status: OrderStatus) -> DemoResult<SyncState> {
    wait_until(client, |state| state.status() == Some(status)).await
}

#[tokio::main]
async fn main() -> DemoResult<()> {
    setup_tracing();

    let config = match SessionConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "No session configured, using the demo table");
            SessionConfig::new("resto_1", "table_7")?
        }
    };

    let backend = InMemoryBackend::new();
    let gateway: Arc<dyn OrderGateway> = Arc::new(backend.clone());

    let alice = TableSession::start(config.clone(), gateway.clone()).await?;
    let bob = TableSession::start(config, gateway).await?;

    let empanada = Product::new("p_empanada", "Empanada", Decimal::from(2500));
    let pisco = Product::new("p_pisco", "Pisco Sour", Decimal::from(4500));

    async {
        let cart = alice.cart();
        cart.add_product(empanada.clone()).await?;
        cart.add_product(empanada.clone()).await?;
        info!(order_id = ?alice.active_order_id(), "Alice opened the order");

        // Bob started before the order existed.
        bob.client().resync().await?;
        bob.cart().add_product(pisco.clone()).await?;

        let state = wait_until(alice.client(), |state| {
            state
                .order
                .as_ref()
                .is_some_and(|order| order.item(&pisco.id).is_some())
        })
        .await?;
        let cart = alice.cart().cart();
        info!(items = cart.item_count, total = %cart.total, subscribed = state.subscribed, "Shared cart");

        alice
            .cart()
            .place_order(Some("No onions in the empanadas".to_string()))
            .await?;
        wait_for_status(bob.client(), OrderStatus::Received).await?;
        DemoResult::Ok(())
    }
    .instrument(info_span!("ordering"))
    .await?;

    let order_id = alice
        .active_order_id()
        .ok_or("Alice lost the order")?;

    async {
        backend.set_status(&order_id, OrderStatus::ReadyForPickup)?;
        backend.set_status(&order_id, OrderStatus::Served)?;
        wait_for_status(alice.client(), OrderStatus::Served).await?;

        bob.client()
            .request_assistance(AssistanceTopic::Napkins)
            .await?;
        bob.client().request_bill().await?;
        DemoResult::Ok(())
    }
    .instrument(info_span!("service"))
    .await?;

    async {
        let mut checkout = alice.checkout();
        let state = wait_for_status(alice.client(), OrderStatus::BillRequested).await?;
        checkout.sync();
        info!(screen = ?Screen::resolve(&state, checkout.step()), "Alice sees the bill");

        for option in checkout.tip_options()? {
            info!(percent = option.percent, amount = %option.amount, "Tip option");
        }
        let intent = checkout.confirm_tip(TipChoice::Percentage(10))?;
        info!(final_total = %intent.final_total, "Paying by card");
        checkout.pay_with_card().await?;

        wait_for_status(bob.client(), OrderStatus::WaitingForPos).await?;
        backend.set_status(&order_id, OrderStatus::Paid)?;

        let state = wait_for_status(alice.client(), OrderStatus::Paid).await?;
        checkout.sync();
        info!(screen = ?Screen::resolve(&state, checkout.step()), "Payment confirmed");

        checkout
            .submit_feedback(5, Some("Lovely empanadas".to_string()))
            .await?;
        wait_for_status(bob.client(), OrderStatus::Paid).await?;
        bob.checkout().skip_feedback().await?;
        DemoResult::Ok(())
    }
    .instrument(info_span!("checkout"))
    .await?;

    info!(
        assistance = backend.assistance_requests().len(),
        feedback = backend.feedback().len(),
        "Backend records"
    );

    alice.shutdown().await;
    bob.shutdown().await;

    info!("Demo completed");
    Ok(())
}
