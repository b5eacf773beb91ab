//! # ReplicaEntity Trait
//!
//! The `ReplicaEntity` trait is the contract a remote record must satisfy to be cached by a
//! [`Replica`](crate::Replica). The device never owns the authoritative copy: it holds a
//! replica that is refreshed by partial patches pushed from the backend.
//!
//! # Architecture Note
//! The associated `Patch` type describes a *partial* update. A push payload only carries the
//! fields that changed, so `merge` must overwrite delivered fields and keep everything else.
//! That is a shallow merge, never a full replace.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any remote record must implement to be held by a [`Replica`](crate::Replica).
pub trait ReplicaEntity: Clone + Send + Sync + 'static {
    /// The backend-assigned identity (opaque to the client).
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// A partial update delivered by the change channel.
    type Patch: Send + Sync + Debug;

    /// Identity of this record.
    fn id(&self) -> &Self::Id;

    /// Shallow-merge a partial update into the record.
    fn merge(&mut self, patch: Self::Patch);

    /// Whether the record reached a status after which it no longer counts as active.
    fn is_terminal(&self) -> bool;
}
