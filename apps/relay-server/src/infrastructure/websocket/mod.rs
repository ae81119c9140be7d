//! WebSocket Connection Adapter
//!
//! Implements the `Connection` port over an upgraded axum WebSocket.
//!
//! The socket is split into sink and stream halves, each behind its own
//! async mutex: the session's reader holds the stream while any number of
//! writers (broadcaster, tick producer, command replies) take turns on the
//! sink. Ping/pong frames are handled by the transport and never surface
//! as messages.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;

use crate::application::ports::{Connection, ConnectionError};
use crate::domain::connection::ConnectionId;
use crate::domain::message::Payload;

/// A client connection over an upgraded WebSocket.
pub struct WsConnection {
    id: ConnectionId,
    remote_addr: SocketAddr,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
    closed: AtomicBool,
}

impl WsConnection {
    /// Wrap an upgraded socket.
    #[must_use]
    pub fn new(socket: WebSocket, remote_addr: SocketAddr) -> Self {
        let (sink, stream) = socket.split();
        Self {
            id: ConnectionId::new(),
            remote_addr,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed: AtomicBool::new(false),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnection")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn recv(&self) -> Result<Payload, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Payload::Text(text.as_str().to_owned())),
                Some(Ok(Message::Binary(bytes))) => return Ok(Payload::Binary(bytes.to_vec())),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(
                        connection_id = %self.id,
                        remote_addr = %self.remote_addr,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    return Err(ConnectionError::Closed);
                }
                Some(Err(e)) => return Err(ConnectionError::Receive(e.to_string())),
                None => return Err(ConnectionError::Closed),
            }
        }
    }

    async fn send(&self, payload: &Payload) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        let message = match payload {
            Payload::Text(text) => Message::Text(text.clone().into()),
            Payload::Binary(bytes) => Message::Binary(bytes.clone().into()),
        };

        self.sink
            .lock()
            .await
            .send(message)
            .await
            .map_err(|e| ConnectionError::Send(e.to_string()))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut sink = self.sink.lock().await;
        // The peer may already be gone; a failed close handshake is fine.
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
        tracing::debug!(
            connection_id = %self.id,
            remote_addr = %self.remote_addr,
            "WebSocket closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::extract::ws::WebSocketUpgrade;
    use axum::routing::get;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::Message as ClientMessage;

    use super::*;

    type Outcome = (Result<(), ConnectionError>, Result<Payload, ConnectionError>);

    #[tokio::test]
    async fn close_is_idempotent_and_rejects_later_io() {
        let (tx, rx) = oneshot::channel::<Outcome>();
        let tx = Arc::new(parking_lot::Mutex::new(Some(tx)));

        let app = Router::new().route(
            "/",
            get(move |ws: WebSocketUpgrade| {
                let tx = Arc::clone(&tx);
                async move {
                    ws.on_upgrade(move |socket| async move {
                        let conn = WsConnection::new(socket, SocketAddr::from(([127, 0, 0, 1], 0)));
                        conn.send(&Payload::text("hello")).await.unwrap();
                        conn.close().await;
                        conn.close().await;
                        let outcome = (conn.send(&Payload::text("late")).await, conn.recv().await);
                        if let Some(tx) = tx.lock().take() {
                            let _ = tx.send(outcome);
                        }
                    })
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
            .await
            .unwrap();

        let (late_send, late_recv) = rx.await.unwrap();
        assert_eq!(late_send, Err(ConnectionError::Closed));
        assert_eq!(late_recv, Err(ConnectionError::Closed));

        assert_eq!(
            client.next().await.unwrap().unwrap(),
            ClientMessage::text("hello")
        );
        assert!(matches!(
            client.next().await,
            Some(Ok(ClientMessage::Close(_)))
        ));
    }
}
