//! # Request Replies
//!
//! Every request sent to an actor carries a oneshot sender for its reply.

use crate::error::FrameworkError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel carried by actor requests.
///
/// The error type defaults to [`FrameworkError`]; domain actors plug in their own.
pub type Response<T, E = FrameworkError> = oneshot::Sender<Result<T, E>>;
