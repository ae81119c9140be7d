//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the process plumbing around them.

/// Configuration loading.
pub mod config;

/// In-memory connection adapter.
pub mod memory;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// HTTP router and server.
pub mod server;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;

/// WebSocket connection adapter.
pub mod websocket;
