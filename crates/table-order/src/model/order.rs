/// The shared order of one table.
///
/// # Replica
/// This struct implements [`ReplicaEntity`](replica_framework::ReplicaEntity): each device
/// holds a cached copy that is refreshed by [`OrderPatch`]es pushed from the backend.
/// The table owns the order, not any single device.
use super::ids::{OrderId, ProductId, RestaurantId, TableId};
use super::status::OrderStatus;
use replica_framework::ReplicaEntity;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One product and its quantity within an order.
///
/// The unit price is captured when the product is first added and never re-fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price,
            quantity,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => f.write_str("cash"),
            PaymentMethod::Card => f.write_str("card"),
        }
    }
}

/// How the diners are settling the bill.
///
/// `amount_received` and `change` are only present for cash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub tip_amount: Decimal,
    pub final_total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_received: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub table_id: TableId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<RestaurantId>,
    pub status: OrderStatus,
    /// Insertion-ordered, unique per product.
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub observations: Option<String>,
    /// Subtotal, tip excluded.
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub payment_details: Option<PaymentDetails>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Order {
    /// An order that was just created: still taking items, nothing confirmed yet.
    pub fn new(id: impl Into<OrderId>, table_id: impl Into<TableId>) -> Self {
        Self {
            id: id.into(),
            table_id: table_id.into(),
            restaurant_id: None,
            status: OrderStatus::Ordering,
            items: Vec::new(),
            observations: None,
            total: Decimal::ZERO,
            payment_details: None,
            rating: None,
            comment: None,
        }
    }

    pub fn item(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Σ price × quantity over the line items.
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }
}

impl ReplicaEntity for Order {
    type Id = OrderId;
    type Patch = OrderPatch;

    fn id(&self) -> &OrderId {
        &self.id
    }

    /// Delivered fields overwrite, undelivered fields are kept.
    fn merge(&mut self, patch: OrderPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(items) = patch.items {
            self.items = items;
        }
        if let Some(observations) = patch.observations {
            self.observations = observations;
        }
        if let Some(total) = patch.total {
            self.total = total;
        }
        if let Some(payment_details) = patch.payment_details {
            self.payment_details = payment_details;
        }
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(comment) = patch.comment {
            self.comment = comment;
        }
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A partial update of an [`Order`].
///
/// Outer `None` means "not delivered". For nullable columns the inner option carries an
/// explicit `null`, so `{"observations": null}` clears the field while a payload without
/// the key leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
    #[serde(
        default,
        deserialize_with = "delivered",
        skip_serializing_if = "Option::is_none"
    )]
    pub observations: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "delivered",
        skip_serializing_if = "Option::is_none"
    )]
    pub payment_details: Option<Option<PaymentDetails>>,
    #[serde(
        default,
        deserialize_with = "delivered",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<Option<u8>>,
    #[serde(
        default,
        deserialize_with = "delivered",
        skip_serializing_if = "Option::is_none"
    )]
    pub comment: Option<Option<String>>,
}

/// A key that is present, even with a `null` value, counts as delivered.
fn delivered<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// The item list together with the subtotal the backend derives from it.
    pub fn items(items: Vec<LineItem>) -> Self {
        let total = items.iter().map(LineItem::line_total).sum();
        Self {
            items: Some(items),
            total: Some(total),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
