//! # Table Order
//!
//! The client side of a shared restaurant table order. Every diner at a table uses their own
//! device; all devices hold a replica of the same order and converge on it through the
//! backend's push channel.
//!
//! ## Modules
//!
//! - **[sync_actor]**: The Order Synchronization Core. One actor per device owns the replica,
//!   the subscription and the upsert queues.
//! - **[clients]**: [`OrderSyncClient`](clients::OrderSyncClient), the typed handle to the core.
//! - **[cart]**: The collaborative cart, derived from the replica on every read.
//! - **[checkout]**: Tip, payment and feedback, driven by the order status.
//! - **[gateway]**: The backend contract, an in-memory backend and a scripted mock.
//! - **[lifecycle]**: [`TableSession`](lifecycle::TableSession) wires the pieces for one device.
//! - **[model]**, **[config]**, **[screen]**, **[assistance]**: Shared data types.
//!
//! ## Testing
//!
//! [`gateway::InMemoryBackend`] runs several devices against one store;
//! [`gateway::MockGateway`] scripts the answers for a single device.

pub mod assistance;
pub mod cart;
pub mod checkout;
pub mod clients;
pub mod config;
pub mod gateway;
pub mod lifecycle;
pub mod model;
pub mod screen;
pub mod sync_actor;
