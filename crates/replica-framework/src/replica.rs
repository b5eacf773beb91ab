//! # Single-Record Replica
//!
//! This module defines the `Replica`, the cache an actor owns for the one record it tracks.
//! The replica is only ever touched from inside the owning actor task, so it needs no locks.
//!
//! ## Identity and Epochs
//!
//! Remote calls are issued with the replica's current [`Epoch`] and their responses are
//! checked against it when they come back. The epoch advances whenever the identity is
//! *invalidated*:
//!
//! - the record is cleared (an explicit reset), or
//! - a record with a different id replaces the current one.
//!
//! Going from "no record" to "first record" does **not** advance the epoch. Several calls
//! issued while no record existed may each learn the id that the first of them created,
//! and their responses remain valid.

use crate::entity::ReplicaEntity;
use crate::error::FrameworkError;
use std::fmt;
use tracing::debug;

/// Generation counter for the replica identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Epoch(u64);

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch_{}", self.0)
    }
}

/// What happened to the identity when a full record was adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    /// There was no record before.
    Fresh,
    /// Same id: the cached record was refreshed in place.
    Refreshed,
    /// A different id replaced the previous record. The epoch advanced.
    Replaced,
}

/// Holds at most one record of type `T`.
///
/// ```rust
/// use replica_framework::{Adoption, Replica, ReplicaEntity};
///
/// #[derive(Clone, Debug)]
/// struct Ticket { id: u32, note: String, closed: bool }
///
/// #[derive(Debug)]
/// struct TicketPatch { note: Option<String> }
///
/// impl ReplicaEntity for Ticket {
///     type Id = u32;
///     type Patch = TicketPatch;
///     fn id(&self) -> &u32 { &self.id }
///     fn merge(&mut self, patch: TicketPatch) {
///         if let Some(note) = patch.note { self.note = note; }
///     }
///     fn is_terminal(&self) -> bool { self.closed }
/// }
///
/// let mut replica = Replica::new();
/// let issued = replica.epoch();
/// assert_eq!(replica.adopt(Ticket { id: 1, note: "a".into(), closed: false }), Adoption::Fresh);
/// assert!(replica.merge(TicketPatch { note: Some("b".into()) }));
/// assert_eq!(replica.get().map(|t| t.note.as_str()), Some("b"));
///
/// replica.clear();
/// assert!(!replica.is_current(issued));
/// ```
#[derive(Debug)]
pub struct Replica<T: ReplicaEntity> {
    current: Option<T>,
    epoch: u64,
}

impl<T: ReplicaEntity> Default for Replica<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ReplicaEntity> Replica<T> {
    pub fn new() -> Self {
        Self {
            current: None,
            epoch: 0,
        }
    }

    pub fn epoch(&self) -> Epoch {
        Epoch(self.epoch)
    }

    /// Whether a response issued at `epoch` may still be applied.
    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.epoch == epoch.0
    }

    pub fn id(&self) -> Option<&T::Id> {
        self.current.as_ref().map(ReplicaEntity::id)
    }

    pub fn get(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn is_vacant(&self) -> bool {
        self.current.is_none()
    }

    /// Installs a full record, replacing whatever was cached.
    pub fn adopt(&mut self, record: T) -> Adoption {
        let adoption = match self.id() {
            None => Adoption::Fresh,
            Some(id) if id == record.id() => Adoption::Refreshed,
            Some(_) => {
                self.epoch += 1;
                Adoption::Replaced
            }
        };
        debug!(id = %record.id(), ?adoption, epoch = self.epoch, "Adopt");
        self.current = Some(record);
        adoption
    }

    /// Shallow-merges a patch. Returns `false` when there is nothing to merge into.
    pub fn merge(&mut self, patch: T::Patch) -> bool {
        match self.current.as_mut() {
            Some(record) => {
                record.merge(patch);
                true
            }
            None => {
                debug!(?patch, "Merge ignored, replica is vacant");
                false
            }
        }
    }

    /// Drops the record and invalidates every response issued before this call.
    pub fn clear(&mut self) -> Option<T> {
        self.epoch += 1;
        debug!(epoch = self.epoch, "Clear");
        self.current.take()
    }
}

/// Picks the single active record out of a lookup result.
///
/// Terminal records are ignored. More than one remaining record violates the
/// at-most-one-active invariant and is reported instead of silently picking one.
pub fn select_active<T: ReplicaEntity>(records: Vec<T>) -> Result<Option<T>, FrameworkError> {
    let mut active: Vec<T> = records.into_iter().filter(|r| !r.is_terminal()).collect();
    match active.len() {
        0 => Ok(None),
        1 => Ok(active.pop()),
        count => Err(FrameworkError::AmbiguousReplica { count }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Tab {
        id: String,
        covers: u32,
        note: Option<String>,
        settled: bool,
    }

    #[derive(Debug, Default)]
    struct TabPatch {
        covers: Option<u32>,
        note: Option<Option<String>>,
        settled: Option<bool>,
    }

    impl ReplicaEntity for Tab {
        type Id = String;
        type Patch = TabPatch;

        fn id(&self) -> &String {
            &self.id
        }

        fn merge(&mut self, patch: TabPatch) {
            if let Some(covers) = patch.covers {
                self.covers = covers;
            }
            if let Some(note) = patch.note {
                self.note = note;
            }
            if let Some(settled) = patch.settled {
                self.settled = settled;
            }
        }

        fn is_terminal(&self) -> bool {
            self.settled
        }
    }

    fn tab(id: &str) -> Tab {
        Tab {
            id: id.to_string(),
            covers: 2,
            note: Some("window seat".to_string()),
            settled: false,
        }
    }

    #[test]
    fn test_merge_keeps_undelivered_fields() {
        let mut replica = Replica::new();
        replica.adopt(tab("tab_1"));

        assert!(replica.merge(TabPatch {
            covers: Some(4),
            ..Default::default()
        }));

        let current = replica.get().unwrap();
        assert_eq!(current.covers, 4);
        assert_eq!(current.note.as_deref(), Some("window seat"));
    }

    #[test]
    fn test_merge_can_clear_nullable_field() {
        let mut replica = Replica::new();
        replica.adopt(tab("tab_1"));

        replica.merge(TabPatch {
            note: Some(None),
            ..Default::default()
        });

        assert_eq!(replica.get().unwrap().note, None);
    }

    #[test]
    fn test_merge_into_vacant_replica_is_ignored() {
        let mut replica: Replica<Tab> = Replica::new();
        assert!(!replica.merge(TabPatch::default()));
        assert!(replica.is_vacant());
    }

    #[test]
    fn test_first_adoption_keeps_epoch() {
        let mut replica = Replica::new();
        let issued = replica.epoch();

        assert_eq!(replica.adopt(tab("tab_1")), Adoption::Fresh);
        assert!(replica.is_current(issued));

        assert_eq!(replica.adopt(tab("tab_1")), Adoption::Refreshed);
        assert!(replica.is_current(issued));
    }

    #[test]
    fn test_replacement_and_clear_advance_epoch() {
        let mut replica = Replica::new();
        replica.adopt(tab("tab_1"));
        let issued = replica.epoch();

        assert_eq!(replica.adopt(tab("tab_2")), Adoption::Replaced);
        assert!(!replica.is_current(issued));

        let before_clear = replica.epoch();
        assert_eq!(replica.clear().map(|t| t.id), Some("tab_2".to_string()));
        assert!(!replica.is_current(before_clear));
        assert_eq!(replica.id(), None);
    }

    #[test]
    fn test_clear_on_vacant_replica_still_invalidates() {
        let mut replica: Replica<Tab> = Replica::new();
        let issued = replica.epoch();
        assert!(replica.clear().is_none());
        assert!(!replica.is_current(issued));
    }

    #[test]
    fn test_select_active() {
        assert_eq!(select_active::<Tab>(vec![]).unwrap(), None);

        let mut settled = tab("tab_0");
        settled.settled = true;
        let picked = select_active(vec![settled, tab("tab_1")]).unwrap();
        assert_eq!(picked.map(|t| t.id), Some("tab_1".to_string()));

        let err = select_active(vec![tab("tab_1"), tab("tab_2")]).unwrap_err();
        assert_eq!(err, FrameworkError::AmbiguousReplica { count: 2 });
    }
}
