//! In-Memory Connection Adapter
//!
//! Channel-backed implementation of the `Connection` port. The server side
//! is a `MemoryConnection`; the client side is a `MemoryPeer` that can feed
//! messages, inject read errors, observe writes, and disconnect.
//!
//! Suitable for testing and development. Not for production use.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::application::ports::{Connection, ConnectionError};
use crate::domain::connection::ConnectionId;
use crate::domain::message::Payload;

/// Item delivered to the server-side reader.
#[derive(Debug)]
enum Inbound {
    Message(Payload),
    Error(String),
}

/// Server-side end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<Inbound>>,
    outbound: mpsc::UnboundedSender<Payload>,
    closed: AtomicBool,
    fail_writes: AtomicBool,
    close_calls: AtomicUsize,
    sends: AtomicUsize,
}

impl MemoryConnection {
    /// Create a connected server/peer pair.
    #[must_use]
    pub fn pair() -> (Arc<Self>, MemoryPeer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let connection = Arc::new(Self {
            id: ConnectionId::new(),
            inbound: Mutex::new(inbound_rx),
            outbound: outbound_tx,
            closed: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            sends: AtomicUsize::new(0),
        });

        let peer = MemoryPeer {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
            connection: Arc::clone(&connection),
        };

        (connection, peer)
    }

    /// Check whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of times `close` has been called.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Acquire)
    }

    /// Number of write attempts, including rejected ones.
    #[must_use]
    pub fn send_attempts(&self) -> usize {
        self.sends.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn recv(&self) -> Result<Payload, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        match self.inbound.lock().await.recv().await {
            Some(Inbound::Message(payload)) => Ok(payload),
            Some(Inbound::Error(message)) => Err(ConnectionError::Receive(message)),
            None => Err(ConnectionError::Closed),
        }
    }

    async fn send(&self, payload: &Payload) -> Result<(), ConnectionError> {
        self.sends.fetch_add(1, Ordering::AcqRel);

        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(ConnectionError::Send("write rejected".to_string()));
        }

        self.outbound
            .send(payload.clone())
            .map_err(|_| ConnectionError::Send("peer dropped".to_string()))
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::AcqRel);
        self.closed.store(true, Ordering::Release);
    }
}

/// Client-side end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    inbound: Option<mpsc::UnboundedSender<Inbound>>,
    outbound: mpsc::UnboundedReceiver<Payload>,
    connection: Arc<MemoryConnection>,
}

impl MemoryPeer {
    /// Send a text message to the server side.
    pub fn send_text(&self, text: &str) {
        self.push(Inbound::Message(Payload::text(text)));
    }

    /// Send an arbitrary payload to the server side.
    pub fn send(&self, payload: Payload) {
        self.push(Inbound::Message(payload));
    }

    /// Make the server's next read fail with a non-EOF error.
    pub fn inject_read_error(&self, message: &str) {
        self.push(Inbound::Error(message.to_string()));
    }

    /// Make every subsequent server-side write fail.
    pub fn fail_writes(&self) {
        self.connection.fail_writes.store(true, Ordering::Release);
    }

    /// Disconnect: the server's reads observe end-of-stream once the
    /// already queued messages are drained.
    pub fn disconnect(&mut self) {
        self.inbound = None;
    }

    /// Wait for the next message written by the server.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.outbound.recv().await
    }

    /// Take a message written by the server, if one is queued.
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.outbound.try_recv().ok()
    }

    fn push(&self, item: Inbound) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(item);
        }
    }
}
