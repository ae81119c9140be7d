//! Broadcast Engine
//!
//! Best-effort fan-out of one message to every registered connection except
//! its sender. A failing peer is logged and skipped; removing it from the
//! registry is left to the session that owns it.

use std::time::Instant;

use futures_util::future::join_all;

use super::registry::SharedRegistry;
use crate::domain::connection::ConnectionId;
use crate::domain::message::Payload;
use crate::infrastructure::metrics;

/// Delivers messages to all chat connections but the origin.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: SharedRegistry,
}

impl Broadcaster {
    /// Create a broadcaster over the given registry.
    #[must_use]
    pub const fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Write `payload` once to every registered connection other than `origin`.
    ///
    /// Writes are issued concurrently; there is no ordering across peers.
    pub async fn broadcast(&self, payload: &Payload, origin: ConnectionId) {
        let peers = self.registry.snapshot_excluding(origin);
        if peers.is_empty() {
            tracing::debug!(origin = %origin, "No peers to broadcast to");
            return;
        }

        let started = Instant::now();
        let results = join_all(peers.iter().map(|peer| async move {
            (peer.id(), peer.send(payload).await)
        }))
        .await;

        let mut delivered = 0_u64;
        let mut failed = 0_u64;
        for (peer, result) in results {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        origin = %origin,
                        connection_id = %peer,
                        error = %e,
                        "Error broadcasting"
                    );
                }
            }
        }

        metrics::record_broadcast(delivered, failed, started.elapsed());
        tracing::debug!(
            origin = %origin,
            kind = payload.kind(),
            bytes = payload.len(),
            delivered,
            failed,
            "Broadcast complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::ports::{Connection, ConnectionError, MockConnection};
    use crate::application::services::registry::ConnectionRegistry;
    use crate::infrastructure::memory::MemoryConnection;

    fn setup() -> (Arc<ConnectionRegistry>, Broadcaster) {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        (registry, broadcaster)
    }

    #[tokio::test]
    async fn delivers_to_everyone_but_origin() {
        let (registry, broadcaster) = setup();
        let (a, mut pa) = MemoryConnection::pair();
        let (b, mut pb) = MemoryConnection::pair();
        let (c, mut pc) = MemoryConnection::pair();
        for conn in [&a, &b, &c] {
            registry.add(&(Arc::clone(conn) as Arc<dyn Connection>));
        }

        broadcaster.broadcast(&Payload::text("X"), a.id()).await;

        assert_eq!(pb.recv().await, Some(Payload::text("X")));
        assert_eq!(pc.recv().await, Some(Payload::text("X")));
        assert!(pa.try_recv().is_none());
        assert_eq!(a.send_attempts(), 0);
    }

    #[tokio::test]
    async fn failing_peer_does_not_abort_batch() {
        let (registry, broadcaster) = setup();
        let (origin, _po) = MemoryConnection::pair();
        let (c, mut pc) = MemoryConnection::pair();
        let (d, mut pd) = MemoryConnection::pair();

        let failing_id = ConnectionId::new();
        let mut failing = MockConnection::new();
        failing.expect_id().return_const(failing_id);
        failing
            .expect_send()
            .times(1)
            .returning(|_| Err(ConnectionError::Send("broken pipe".to_string())));
        let failing: Arc<dyn Connection> = Arc::new(failing);

        registry.add(&(Arc::clone(&origin) as Arc<dyn Connection>));
        registry.add(&failing);
        registry.add(&(Arc::clone(&c) as Arc<dyn Connection>));
        registry.add(&(Arc::clone(&d) as Arc<dyn Connection>));

        broadcaster
            .broadcast(&Payload::text("still delivered"), origin.id())
            .await;

        assert_eq!(pc.recv().await, Some(Payload::text("still delivered")));
        assert_eq!(pd.recv().await, Some(Payload::text("still delivered")));
        assert!(
            registry.contains(failing_id),
            "broadcast must not unregister failing peers"
        );
    }

    #[tokio::test]
    async fn raw_payload_is_forwarded_untouched() {
        let (registry, broadcaster) = setup();
        let (a, _pa) = MemoryConnection::pair();
        let (b, mut pb) = MemoryConnection::pair();
        registry.add(&(Arc::clone(&a) as Arc<dyn Connection>));
        registry.add(&(Arc::clone(&b) as Arc<dyn Connection>));

        broadcaster.broadcast(&Payload::text("  spaced  "), a.id()).await;
        broadcaster
            .broadcast(&Payload::Binary(vec![0, 159, 146, 150]), a.id())
            .await;

        assert_eq!(pb.recv().await, Some(Payload::text("  spaced  ")));
        assert_eq!(pb.recv().await, Some(Payload::Binary(vec![0, 159, 146, 150])));
    }

    #[tokio::test]
    async fn lone_sender_is_noop() {
        let (registry, broadcaster) = setup();
        let (a, mut pa) = MemoryConnection::pair();
        registry.add(&(Arc::clone(&a) as Arc<dyn Connection>));

        broadcaster.broadcast(&Payload::text("echo?"), a.id()).await;

        assert!(pa.try_recv().is_none());
    }
}
