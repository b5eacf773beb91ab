//! # Order Synchronization Core
//!
//! Keeps one device's view of the table order consistent with the backend.
//!
//! ## Identity
//!
//! The core starts with no order. [`initialize`](crate::clients::OrderSyncClient::initialize)
//! looks up the table's active order; the first item mutation on a table without one makes
//! the backend create it, and the core takes over the id from the response. Every other
//! operation fails with [`SyncError::NoActiveOrder`] until then.
//!
//! ## Consistency
//!
//! | Operation | Local effect |
//! |-----------|--------------|
//! | Item upsert | None until the backend's push echoes it |
//! | Status transition | `{status, ...details}` merged once the backend accepts |
//! | Assistance | None |
//! | Feedback | None |
//! | Reset | Order, subscription and queued upserts dropped |
//!
//! A response that comes back after the identity changed is answered with [`Ack::Stale`]
//! and never applied.

pub mod actor;
pub mod error;
pub mod messages;
pub mod state;

pub use actor::OrderSyncActor;
pub use error::{SyncError, ValidationError};
pub use messages::{QuantityChange, SyncRequest};
pub use state::{Ack, SyncPhase, SyncState};
