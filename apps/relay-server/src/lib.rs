#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::items_after_statements
    )
)]

//! Relay Server - WebSocket Chat Relay and Synthetic Ticker
//!
//! Clients on the chat endpoint have every message forwarded to all other
//! chat clients. Clients on the order book endpoint receive a synthetic
//! trade every few seconds until they disconnect.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: payloads, chat commands, ticks, connection identity
//!
//! - **Application**: the `Connection` port and the services driving it
//!   - `registry`: live chat connections
//!   - `broadcaster`: fan-out to every peer but the sender
//!   - `chat` / `ticker`: per-connection session lifecycles
//!
//! - **Infrastructure**: adapters and process plumbing
//!   - `websocket`: `Connection` over axum WebSockets
//!   - `memory`: channel-backed `Connection` for tests
//!   - `server`: router, health, and metrics routes
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! /ws client ──► ChatSession ──► Broadcaster ──► other /ws clients
//!                    │                ▲
//!                    └─► Registry ────┘
//!
//! /wsorderbook client ◄── tick producer ◄── TickerSession
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core relay types with no I/O.
pub mod domain;

/// Application layer - Session services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::ConnectionId;
pub use domain::message::{COUNT_COMMAND, ChatCommand, Payload, count_reply};
pub use domain::tick::Tick;

// Ports and services
pub use application::ports::{Connection, ConnectionError};
pub use application::services::{
    Broadcaster, ChatSession, ConnectionRegistry, SharedRegistry, TickerSession,
};

// Adapters
pub use infrastructure::memory::{MemoryConnection, MemoryPeer};
pub use infrastructure::websocket::WsConnection;

// Server and config
pub use infrastructure::config::{ConfigError, RelayConfig, ServerSettings, SessionSettings};
pub use infrastructure::server::{
    AppState, HealthResponse, HealthStatus, RelayServer, ServerError, build_router,
};

// Metrics
pub use infrastructure::metrics::{ConnectionKind, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
