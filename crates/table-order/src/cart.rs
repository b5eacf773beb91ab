//! # Collaborative Cart View
//!
//! The cart is never stored. It is derived from the synchronized order every time it is
//! read, so every device at the table sees the same lines once the backend has echoed them.
//! Only an order that is still `ordering` has a cart; from `received` on it is empty.

use crate::clients::OrderSyncClient;
use crate::gateway::StatusDetails;
use crate::model::{LineItem, Order, OrderStatus, Product, ProductId};
use crate::sync_actor::{Ack, QuantityChange, SyncError};
use rust_decimal::Decimal;
use tracing::{info, instrument};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CartError {
    #[error("Product {0} is not in the cart")]
    NotInCart(ProductId),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Lines, total and item count of the shared cart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    pub items: Vec<LineItem>,
    /// Σ price × quantity.
    pub total: Decimal,
    /// Σ quantity.
    pub item_count: u32,
}

impl Cart {
    pub fn from_order(order: Option<&Order>) -> Self {
        match order {
            Some(order) if order.status == OrderStatus::Ordering => {
                let items = order.items.clone();
                Self {
                    total: items.iter().map(LineItem::line_total).sum(),
                    item_count: items.iter().map(|item| item.quantity).sum(),
                    items,
                }
            }
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn line(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.line(product_id).map(|item| item.quantity).unwrap_or(0)
    }
}

/// Cart operations for one device. All writes go through the sync core.
#[derive(Clone)]
pub struct CartView {
    core: OrderSyncClient,
}

impl CartView {
    pub fn new(core: OrderSyncClient) -> Self {
        Self { core }
    }

    pub fn cart(&self) -> Cart {
        Cart::from_order(self.core.state().order.as_ref())
    }

    /// Adds one unit, merging into the existing line when there is one.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_product(&self, product: Product) -> Result<Ack, CartError> {
        Ok(self.core.add_item(product).await?)
    }

    /// `+1`/`-1` on a line that is already in the cart. Reaching zero removes it.
    #[instrument(skip(self))]
    pub async fn set_quantity_delta(
        &self,
        product_id: &ProductId,
        delta: i32,
    ) -> Result<Ack, CartError> {
        self.change_line(product_id, QuantityChange::Delta(delta))
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<Ack, CartError> {
        self.change_line(product_id, QuantityChange::Target(quantity))
            .await
    }

    pub async fn remove(&self, product_id: &ProductId) -> Result<Ack, CartError> {
        self.set_quantity(product_id, 0).await
    }

    async fn change_line(
        &self,
        product_id: &ProductId,
        change: QuantityChange,
    ) -> Result<Ack, CartError> {
        let line = self
            .cart()
            .line(product_id)
            .cloned()
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        let product = Product::new(line.product_id, line.name, line.price);
        Ok(self.core.upsert_item(product, change).await?)
    }

    /// Sends the cart to the kitchen. An empty cart is the caller's concern.
    #[instrument(skip(self, observations))]
    pub async fn place_order(&self, observations: Option<String>) -> Result<Ack, CartError> {
        let details = match observations.filter(|text| !text.trim().is_empty()) {
            Some(text) => StatusDetails::observations(text),
            None => StatusDetails::default(),
        };
        let ack = self.core.transition(OrderStatus::Received, details).await?;
        info!(?ack, "Order placed");
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus) -> Order {
        let mut order = Order::new("order_1", "table_7");
        order.status = status;
        order.items = vec![
            LineItem::new("p1", "Empanada", Decimal::from(2500), 2),
            LineItem::new("p2", "Pisco Sour", Decimal::new(45005, 1), 3),
        ];
        order
    }

    #[test]
    fn test_totals_are_derived_from_items() {
        let cart = Cart::from_order(Some(&order(OrderStatus::Ordering)));
        assert_eq!(cart.total, Decimal::new(185015, 1));
        assert_eq!(cart.item_count, 5);
        assert_eq!(cart.quantity_of(&"p2".into()), 3);
        assert_eq!(cart.quantity_of(&"p9".into()), 0);
    }

    #[test]
    fn test_no_cart_once_checkout_started() {
        assert!(Cart::from_order(Some(&order(OrderStatus::Received))).is_empty());
        assert!(Cart::from_order(Some(&order(OrderStatus::BillRequested))).is_empty());
        assert_eq!(Cart::from_order(None), Cart::default());
    }
}
