//! # Replica Framework
//!
//! Building blocks for keeping a *client-held replica* of one remote record consistent with
//! the backend that owns it.
//!
//! ## The Model
//!
//! A device never owns the authoritative record. It owns a replica that is:
//!
//! - **Seeded** by a lookup that must match at most one active record ([`select_active`]).
//! - **Refreshed** by ordered partial patches from a push channel ([`Subscription`]).
//! - **Guarded** by an [`Epoch`] so that responses issued before an identity change are
//!   recognised as stale and dropped.
//!
//! All mutation of the replica happens inside a single actor task. Other components talk to
//! the actor through an [`ActorHandle`] and never touch the replica directly, so no locks are
//! needed around it.
//!
//! ## Layers
//!
//! 1. **Entity Layer** ([`ReplicaEntity`]) - identity, patch merge, terminal check
//! 2. **State Layer** ([`Replica`]) - the single cached record and its epoch
//! 3. **Channel Layer** ([`Subscription`], [`Publisher`]) - ordered push delivery
//! 4. **Interface Layer** ([`ActorHandle`]) - typed request/reply to the owning actor
//!
//! Domain crates supply the entity, the actor loop and the typed client on top of these.

pub mod client;
pub mod entity;
pub mod error;
pub mod message;
pub mod replica;
pub mod subscription;
pub mod tracing;

pub use client::ActorHandle;
pub use entity::ReplicaEntity;
pub use error::FrameworkError;
pub use message::Response;
pub use replica::{select_active, Adoption, Epoch, Replica};
pub use subscription::{Publisher, Subscription, SubscriptionId};
