//! Shared helpers for the relay integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use relay_server::{AppState, RelayConfig, RelayServer, ServerError};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub async fn start(tick_interval: Duration) -> Self {
        let mut config = RelayConfig::default();
        config.session.tick_interval = tick_interval;
        config.session.read_error_backoff = Duration::from_millis(10);

        let shutdown = CancellationToken::new();
        let server = RelayServer::new(&config, shutdown.clone());
        let state = server.state();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(server.serve(listener));

        Self {
            addr,
            state,
            shutdown,
            handle,
        }
    }

    pub async fn connect(&self, path: &str) -> Client {
        let (client, _) = connect_async(format!("ws://{}{path}", self.addr))
            .await
            .expect("WebSocket handshake");
        client
    }
}

/// Poll `condition` until it holds, failing after two seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Next data frame, skipping control frames.
pub async fn next_data(client: &mut Client) -> Message {
    timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(message)) => return message,
                other => panic!("stream ended: {other:?}"),
            }
        }
    })
    .await
    .expect("no message in time")
}

pub async fn next_text(client: &mut Client) -> String {
    match next_data(client).await {
        Message::Text(text) => text.as_str().to_owned(),
        other => panic!("expected text, got {other:?}"),
    }
}

/// Assert nothing arrives within a short window.
pub async fn assert_silent(client: &mut Client) {
    let result = timeout(Duration::from_millis(200), client.next()).await;
    assert!(result.is_err(), "unexpected message: {result:?}");
}
