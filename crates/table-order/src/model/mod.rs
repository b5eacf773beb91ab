//! # Domain Model
//!
//! The shared table order and the values it is built from. Everything here is plain data:
//! the sync core owns the only live copy and the views only ever see clones.

pub mod ids;
pub mod order;
pub mod product;
pub mod status;

pub use ids::{OrderId, ProductId, RestaurantId, TableId};
pub use order::{LineItem, Order, OrderPatch, PaymentDetails, PaymentMethod};
pub use product::Product;
pub use status::OrderStatus;
