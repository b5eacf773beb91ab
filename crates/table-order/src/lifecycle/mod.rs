//! # Table Session Lifecycle
//!
//! Wires one device's sync core, cart and checkout together and takes them down again.
//!
//! ## The TableSession Pattern
//!
//! ```rust,ignore
//! let session = TableSession::start(config, gateway).await?;
//!
//! // Views share the same core through cheap clones
//! let cart = session.cart();
//! let mut checkout = session.checkout();
//!
//! cart.add_product(product).await?;
//! cart.place_order(None).await?;
//!
//! session.shutdown().await;
//! ```
//!
//! ## Graceful Shutdown
//!
//! Views hold clones of the [`OrderSyncClient`](crate::clients::OrderSyncClient), so the
//! actor cannot rely on its request channel closing. [`TableSession::shutdown`] sends an
//! explicit `Shutdown` request instead:
//!
//! 1. **Shutdown request** - the actor leaves its loop after the requests ahead of it
//! 2. **Unsubscribe** - the push subscription is released on the backend
//! 3. **Await completion** - the actor task is joined
//!
//! Responses of remote calls still in flight are dropped; their callers see
//! `ActorDropped`.
//!
//! ## Observability
//!
//! Tracing is set up once per process with
//! [`setup_tracing`](replica_framework::tracing::setup_tracing). The actor logs identity
//! changes and pushed statuses at `info`, and every request and push at `debug`:
//!
//! ```bash
//! RUST_LOG=info cargo run      # Compact logs
//! RUST_LOG=debug cargo run     # Full payloads
//! ```

pub mod table_session;

pub use table_session::*;
