//! # Framework Errors
//!
//! Errors raised by the replica plumbing itself, independent of any domain.

/// Errors that can occur within the replica framework.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    /// More than one non-terminal record matched a lookup that must yield at most one.
    #[error("Ambiguous replica: {count} active records matched")]
    AmbiguousReplica { count: usize },
}
