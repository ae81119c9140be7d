//! Ticker Session Handler
//!
//! Streams synthetic trades to one order book client until it disconnects.
//! Two units cooperate through a single cancellation token:
//!
//! - **Producer** (spawned task): writes a tick, then waits one interval.
//!   Checks the token before every write and exits once it fires, or on
//!   the first failed write.
//! - **Reader** (session task): reads and discards client input purely to
//!   detect disconnect. Any read error ends the session.
//!
//! When the reader exits it fires the token, closes the connection, and
//! joins the producer. The reader is the only party that fires the token;
//! if the session future is dropped instead, a drop guard fires it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Connection, ConnectionError};
use crate::domain::message::Payload;
use crate::domain::tick::Tick;
use crate::infrastructure::metrics::{self, ConnectionKind};

/// Runs order book ticker sessions.
#[derive(Debug, Clone)]
pub struct TickerSession {
    interval: Duration,
    active: Arc<Mutex<usize>>,
}

impl TickerSession {
    /// Create a ticker handler that writes one tick per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            active: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of sessions currently running.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        *self.active.lock()
    }

    /// Drive one connection until it disconnects.
    pub async fn run(&self, connection: Arc<dyn Connection>) {
        let _active = ActiveSession::enter(Arc::clone(&self.active));
        let id = connection.id();
        metrics::record_connection_opened(ConnectionKind::Ticker);
        tracing::info!(connection_id = %id, "New connection for order book");

        let shutdown = CancellationToken::new();
        let _cancel_on_drop = shutdown.clone().drop_guard();
        let producer = tokio::spawn(produce_ticks(
            Arc::clone(&connection),
            shutdown.clone(),
            self.interval,
        ));

        loop {
            match connection.recv().await {
                Ok(payload) => {
                    metrics::record_message_received(ConnectionKind::Ticker);
                    tracing::trace!(connection_id = %id, bytes = payload.len(), "Ignoring client input");
                }
                Err(ConnectionError::Closed) => break,
                Err(e) => {
                    metrics::record_read_error(ConnectionKind::Ticker);
                    tracing::warn!(
                        connection_id = %id,
                        error = %e,
                        "Error reading from order book connection"
                    );
                    break;
                }
            }
        }

        shutdown.cancel();
        connection.close().await;

        if let Err(e) = producer.await {
            tracing::warn!(connection_id = %id, error = %e, "Tick producer task failed");
        }

        metrics::record_connection_closed(ConnectionKind::Ticker);
        tracing::info!(connection_id = %id, "Connection closed for order book");
    }
}

/// Write ticks until `shutdown` fires or a write fails.
async fn produce_ticks(
    connection: Arc<dyn Connection>,
    shutdown: CancellationToken,
    interval: Duration,
) {
    let id = connection.id();

    loop {
        if shutdown.is_cancelled() {
            tracing::debug!(connection_id = %id, "Tick producer stopped");
            return;
        }

        let tick = Payload::Text(Tick::now().to_string());
        if let Err(e) = connection.send(&tick).await {
            tracing::warn!(connection_id = %id, error = %e, "Error in order book");
            return;
        }
        metrics::record_tick_sent();

        tokio::select! {
            () = shutdown.cancelled() => {
                tracing::debug!(connection_id = %id, "Tick producer cancelled during interval");
                return;
            }
            () = tokio::time::sleep(interval) => {}
        }
    }
}

/// Counts a running session for its lifetime.
///
/// The gauge is set while the count is locked, so concurrent sessions
/// cannot publish out of order.
struct ActiveSession {
    active: Arc<Mutex<usize>>,
}

impl ActiveSession {
    fn enter(active: Arc<Mutex<usize>>) -> Self {
        {
            let mut count = active.lock();
            *count += 1;
            metrics::set_ticker_sessions(*count);
        }
        Self { active }
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        let mut count = self.active.lock();
        *count = count.saturating_sub(1);
        metrics::set_ticker_sessions(*count);
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::infrastructure::memory::MemoryConnection;

    const INTERVAL: Duration = Duration::from_secs(5);

    fn assert_tick(payload: Option<Payload>) {
        let payload = payload.expect("expected a tick");
        let text = payload.as_text().unwrap();
        let stamp = text
            .strip_prefix("Time of trade: ")
            .and_then(|rest| rest.strip_suffix(", Price: 100, Quantity: 100"))
            .unwrap_or_else(|| panic!("unexpected tick format: {text}"));
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok(), "bad timestamp {stamp}");
    }

    #[tokio::test(start_paused = true)]
    async fn streams_ticks_on_interval() {
        let ticker = TickerSession::new(INTERVAL);
        let (conn, mut peer) = MemoryConnection::pair();
        let session = {
            let ticker = ticker.clone();
            let conn: Arc<dyn Connection> = Arc::clone(&conn) as Arc<dyn Connection>;
            tokio::spawn(async move { ticker.run(conn).await })
        };

        let start = tokio::time::Instant::now();
        assert_tick(peer.recv().await);
        assert_tick(peer.recv().await);
        assert!(start.elapsed() >= INTERVAL);
        assert_eq!(ticker.active_sessions(), 1);

        peer.disconnect();
        session.await.unwrap();
        assert_eq!(ticker.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn client_input_is_ignored() {
        let ticker = TickerSession::new(INTERVAL);
        let (conn, mut peer) = MemoryConnection::pair();
        let session = {
            let ticker = ticker.clone();
            let conn: Arc<dyn Connection> = Arc::clone(&conn) as Arc<dyn Connection>;
            tokio::spawn(async move { ticker.run(conn).await })
        };

        assert_tick(peer.recv().await);
        peer.send_text("subscribe please");
        assert_tick(peer.recv().await);
        assert!(!conn.is_closed());

        peer.disconnect();
        session.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_stops_producer_and_closes() {
        let ticker = TickerSession::new(INTERVAL);
        let (conn, mut peer) = MemoryConnection::pair();
        let session = {
            let ticker = ticker.clone();
            let conn: Arc<dyn Connection> = Arc::clone(&conn) as Arc<dyn Connection>;
            tokio::spawn(async move { ticker.run(conn).await })
        };

        assert_tick(peer.recv().await);
        peer.disconnect();
        session.await.unwrap();

        assert!(conn.is_closed());
        assert_eq!(conn.close_calls(), 1);
        let attempts = conn.send_attempts();

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(conn.send_attempts(), attempts, "producer wrote after close");
        assert!(peer.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn read_error_is_terminal() {
        let ticker = TickerSession::new(INTERVAL);
        let (conn, mut peer) = MemoryConnection::pair();
        let session = {
            let ticker = ticker.clone();
            let conn: Arc<dyn Connection> = Arc::clone(&conn) as Arc<dyn Connection>;
            tokio::spawn(async move { ticker.run(conn).await })
        };

        assert_tick(peer.recv().await);
        peer.inject_read_error("reset by peer");
        session.await.unwrap();

        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn producer_exits_on_write_failure() {
        let (conn, peer) = MemoryConnection::pair();
        peer.fail_writes();
        let shutdown = CancellationToken::new();

        produce_ticks(conn.clone(), shutdown.clone(), INTERVAL).await;

        assert_eq!(conn.send_attempts(), 1);
        assert!(!shutdown.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_session_stops_producer() {
        let ticker = TickerSession::new(INTERVAL);
        let (conn, mut peer) = MemoryConnection::pair();
        let session = {
            let ticker = ticker.clone();
            let conn: Arc<dyn Connection> = Arc::clone(&conn) as Arc<dyn Connection>;
            tokio::spawn(async move { ticker.run(conn).await })
        };

        assert_tick(peer.recv().await);
        session.abort();
        let _ = session.await;
        assert_eq!(ticker.active_sessions(), 0);

        // Let the producer observe the fired token.
        tokio::time::sleep(Duration::from_millis(1)).await;
        while peer.try_recv().is_some() {}
        let attempts = conn.send_attempts();

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(conn.send_attempts(), attempts, "producer outlived its session");
        assert!(peer.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn producer_honours_fired_signal_before_writing() {
        let (conn, _peer) = MemoryConnection::pair();
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        shutdown.cancel();

        produce_ticks(conn.clone(), shutdown, INTERVAL).await;

        assert_eq!(conn.send_attempts(), 0);
    }
}
