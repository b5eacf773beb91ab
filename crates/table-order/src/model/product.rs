/// A menu entry as the diner picked it.
///
/// The menu itself lives outside this crate; a `Product` is only what the order needs to
/// know about it when a line is first created.
use super::ids::ProductId;
use super::order::LineItem;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
}

impl Product {
    /// Creates a new Product instance.
    ///
    /// # Arguments
    /// * `id` - Menu identifier
    /// * `name` - Display name copied into the order line
    /// * `price` - Unit price, captured once and never re-fetched
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
        }
    }

    pub fn line(&self, quantity: u32) -> LineItem {
        LineItem {
            product_id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            quantity,
        }
    }
}
