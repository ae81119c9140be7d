//! Port Interfaces
//!
//! Defines the interface the session handlers drive. Transport adapters in
//! the infrastructure layer implement it.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Connection`: a bidirectional channel of discrete messages

use async_trait::async_trait;

use crate::domain::connection::ConnectionId;
use crate::domain::message::Payload;

/// Errors surfaced by a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// End of stream: the peer disconnected or the connection was closed.
    #[error("connection closed")]
    Closed,

    /// Reading the next message failed.
    #[error("receive failed: {0}")]
    Receive(String),

    /// Writing a message failed.
    #[error("send failed: {0}")]
    Send(String),
}

impl ConnectionError {
    /// Check whether this error is the end-of-stream signal.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// A bidirectional channel of discrete messages.
///
/// Reads and writes may run concurrently from different tasks: a session
/// reads while the broadcaster or a tick producer writes. `close` is
/// idempotent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connection: Send + Sync {
    /// Identity of this connection.
    fn id(&self) -> ConnectionId;

    /// Wait for the next message.
    ///
    /// Returns `ConnectionError::Closed` once the peer has gone away.
    async fn recv(&self) -> Result<Payload, ConnectionError>;

    /// Write one message.
    async fn send(&self, payload: &Payload) -> Result<(), ConnectionError>;

    /// Close the connection. Calling this more than once is a no-op.
    async fn close(&self);
}
