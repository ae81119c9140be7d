//! Relay HTTP Server
//!
//! Mounts the two WebSocket upgrade endpoints next to the health and
//! metrics routes on a single listener.
//!
//! # Endpoints
//!
//! - `GET /ws` - chat relay
//! - `GET /wsorderbook` - synthetic order book ticker
//! - `GET /health`, `GET /healthz`, `GET /metrics`

mod health;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use health::{HealthResponse, HealthStatus};

use crate::application::ports::Connection;
use crate::application::services::{ChatSession, ConnectionRegistry, SharedRegistry, TickerSession};
use crate::infrastructure::config::RelayConfig;
use crate::infrastructure::websocket::WsConnection;

// =============================================================================
// Shared State
// =============================================================================

/// State shared by every route.
#[derive(Debug)]
pub struct AppState {
    version: String,
    started_at: Instant,
    registry: SharedRegistry,
    chat: ChatSession,
    ticker: TickerSession,
    shutdown: CancellationToken,
}

impl AppState {
    /// Build state from configuration.
    #[must_use]
    pub fn new(config: &RelayConfig, shutdown: CancellationToken) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
            chat: ChatSession::new(Arc::clone(&registry), config.session.read_error_backoff),
            ticker: TickerSession::new(config.session.tick_interval),
            registry,
            shutdown,
        }
    }

    /// Registry of live chat connections.
    #[must_use]
    pub const fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Ticker session handler.
    #[must_use]
    pub const fn ticker(&self) -> &TickerSession {
        &self.ticker
    }
}

/// Build the relay router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(chat_upgrade))
        .route("/wsorderbook", get(ticker_upgrade))
        .route("/health", get(health::health_handler))
        .route("/healthz", get(health::liveness_handler))
        .route("/metrics", get(health::metrics_handler))
        .with_state(state)
}

async fn chat_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let connection: Arc<dyn Connection> = Arc::new(WsConnection::new(socket, remote_addr));
        tracing::debug!(connection_id = %connection.id(), %remote_addr, "Chat upgrade");
        state.chat.run(connection).await;
    })
}

async fn ticker_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let connection: Arc<dyn Connection> = Arc::new(WsConnection::new(socket, remote_addr));
        tracing::debug!(connection_id = %connection.id(), %remote_addr, "Order book upgrade");
        state.ticker.run(connection).await;
    })
}

// =============================================================================
// Server
// =============================================================================

/// The relay HTTP/WebSocket server.
#[derive(Debug)]
pub struct RelayServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: CancellationToken,
}

impl RelayServer {
    /// Create a server from configuration.
    #[must_use]
    pub fn new(config: &RelayConfig, shutdown: CancellationToken) -> Self {
        Self {
            addr: config.server.socket_addr(),
            state: Arc::new(AppState::new(config, shutdown.clone())),
            shutdown,
        }
    }

    /// Shared state, for inspection.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the server stops with an
    /// I/O error.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.addr, e.to_string()))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::ServerFailed` if the server stops with an I/O
    /// error.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::ServerFailed(e.to_string()))?;
        tracing::info!(addr = %local_addr, "WebSocket server started");

        let app = build_router(self.state);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(self.shutdown.cancelled_owned())
        .await
        .map_err(|e| ServerError::ServerFailed(e.to_string()))?;

        tracing::info!("WebSocket server stopped");
        Ok(())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Relay server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind the listener.
    #[error("failed to bind {0}: {1}")]
    BindFailed(SocketAddr, String),

    /// Server stopped with an error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(&RelayConfig::default(), CancellationToken::new()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let (status, body) = get_json(build_router(state()), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["chat_connections"], 0);
        assert_eq!(body["ticker_sessions"], 0);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn health_reports_draining_after_shutdown() {
        let shutdown = CancellationToken::new();
        let state = Arc::new(AppState::new(&RelayConfig::default(), shutdown.clone()));
        shutdown.cancel();

        let (status, body) = get_json(build_router(state), "/health").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "draining");
    }

    #[tokio::test]
    async fn liveness_is_plain_ok() {
        let response = build_router(state())
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn plain_get_on_ws_route_is_rejected() {
        let response = build_router(state())
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
