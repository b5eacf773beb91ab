//! Type-safe identifiers.
//!
//! Every id is an opaque string issued outside this crate: the backend assigns order ids,
//! the menu assigns product ids, and table and restaurant ids come from process start.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Backend-assigned order id. Unknown until the first item mutation for a table.
    OrderId
);
string_id!(
    /// The physical table a device joined.
    TableId
);
string_id!(RestaurantId);
string_id!(
    /// Menu product id. Unique per line item within an order.
    ProductId
);
