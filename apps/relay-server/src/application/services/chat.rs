//! Chat Session Handler
//!
//! Owns one chat connection from registration to close:
//!
//! ```text
//! Registering ──► Reading ──► Closing
//!                  │   ▲
//!                  └───┘ message / transient read error
//! ```
//!
//! Unregister and close run together exactly once per session, on every
//! exit path, through `SessionGuard`.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use super::broadcaster::Broadcaster;
use super::registry::SharedRegistry;
use crate::application::ports::{Connection, ConnectionError};
use crate::domain::message::{ChatCommand, Payload, count_reply};
use crate::infrastructure::metrics::{self, ConnectionKind};

/// Runs chat sessions against a shared registry.
#[derive(Debug, Clone)]
pub struct ChatSession {
    registry: SharedRegistry,
    broadcaster: Broadcaster,
    read_error_backoff: Duration,
}

impl ChatSession {
    /// Create a chat handler.
    ///
    /// `read_error_backoff` is the pause after a non end-of-stream read
    /// error before the next read is attempted.
    #[must_use]
    pub fn new(registry: SharedRegistry, read_error_backoff: Duration) -> Self {
        Self {
            broadcaster: Broadcaster::new(Arc::clone(&registry)),
            registry,
            read_error_backoff,
        }
    }

    /// Drive one connection until it disconnects.
    pub async fn run(&self, connection: Arc<dyn Connection>) {
        let guard = SessionGuard::register(Arc::clone(&self.registry), Arc::clone(&connection));
        self.read_loop(connection.as_ref()).await;
        guard.finish().await;
    }

    async fn read_loop(&self, connection: &dyn Connection) {
        loop {
            match connection.recv().await {
                Ok(payload) => {
                    metrics::record_message_received(ConnectionKind::Chat);
                    tracing::debug!(
                        connection_id = %connection.id(),
                        message = %payload,
                        "Received"
                    );
                    self.dispatch(connection, payload).await;
                }
                Err(ConnectionError::Closed) => break,
                Err(e) => {
                    // Keep reading; the backoff bounds a read that fails
                    // without blocking.
                    metrics::record_read_error(ConnectionKind::Chat);
                    tracing::warn!(
                        connection_id = %connection.id(),
                        error = %e,
                        "Error reading"
                    );
                    tokio::time::sleep(self.read_error_backoff).await;
                }
            }
        }
    }

    async fn dispatch(&self, connection: &dyn Connection, payload: Payload) {
        match ChatCommand::parse(&payload) {
            Some(ChatCommand::Count) => {
                let reply = Payload::Text(count_reply(self.registry.count()));
                if let Err(e) = connection.send(&reply).await {
                    tracing::warn!(
                        connection_id = %connection.id(),
                        error = %e,
                        "Failed to send count reply"
                    );
                }
            }
            None => self.broadcaster.broadcast(&payload, connection.id()).await,
        }
    }
}

// =============================================================================
// Session Guard
// =============================================================================

/// Keeps a connection registered for the guard's lifetime.
///
/// `finish` unregisters and closes in place. If the guard is dropped
/// without `finish` (panic or task abort), the drop unregisters
/// immediately and hands the close to the runtime.
struct SessionGuard {
    registry: SharedRegistry,
    connection: Option<Arc<dyn Connection>>,
}

impl SessionGuard {
    fn register(registry: SharedRegistry, connection: Arc<dyn Connection>) -> Self {
        registry.add(&connection);
        metrics::record_connection_opened(ConnectionKind::Chat);
        tracing::info!(connection_id = %connection.id(), "New connection");

        Self {
            registry,
            connection: Some(connection),
        }
    }

    async fn finish(mut self) {
        if let Some(connection) = self.release() {
            connection.close().await;
        }
    }

    fn release(&mut self) -> Option<Arc<dyn Connection>> {
        let connection = self.connection.take()?;
        self.registry.remove(connection.id());
        metrics::record_connection_closed(ConnectionKind::Chat);
        tracing::info!(connection_id = %connection.id(), "Connection closed");
        Some(connection)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(connection) = self.release()
            && let Ok(handle) = Handle::try_current()
        {
            handle.spawn(async move { connection.close().await });
        }
    }
}
