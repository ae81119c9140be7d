//! Application Layer - Session services and port definitions.
//!
//! This layer contains the session handlers and the connection port they
//! drive. It knows nothing about WebSockets or HTTP.

/// Port interfaces for external systems (client connections).
pub mod ports;

/// Registry, broadcast, and session services.
pub mod services;
