//! # Actor Handle
//!
//! The client half of an actor: a cloneable sender plus the request/reply dance that every
//! typed client repeats. Domain clients wrap an `ActorHandle` and expose named methods.

use crate::error::FrameworkError;
use crate::message::Response;
use tokio::sync::{mpsc, oneshot};

/// Sends requests of type `M` to an actor and awaits their oneshot replies.
///
/// * **Cloneable** – holds only a sender, so cloning is inexpensive.
/// * **Error mapping** – a closed actor or dropped reply surfaces as the caller's error type
///   through `From<FrameworkError>`.
#[derive(Debug)]
pub struct ActorHandle<M> {
    sender: mpsc::Sender<M>,
}

impl<M> Clone for ActorHandle<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<M> ActorHandle<M> {
    pub fn new(sender: mpsc::Sender<M>) -> Self {
        Self { sender }
    }

    /// Creates a handle together with the receiver the actor loop will drain.
    pub fn channel(buffer_size: usize) -> (Self, mpsc::Receiver<M>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self::new(sender), receiver)
    }

    /// Sends a request built around a fresh reply channel and waits for the reply.
    pub async fn call<T, E>(&self, make: impl FnOnce(Response<T, E>) -> M) -> Result<T, E>
    where
        E: From<FrameworkError>,
    {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(make(respond_to))
            .await
            .map_err(|_| E::from(FrameworkError::ActorClosed))?;
        response
            .await
            .map_err(|_| E::from(FrameworkError::ActorDropped))?
    }

    /// Sends a request that expects no reply.
    pub async fn send(&self, message: M) -> Result<(), FrameworkError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| FrameworkError::ActorClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
