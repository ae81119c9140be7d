//! Domain Layer - Core relay types.
//!
//! This layer contains the message, command, and tick types the relay
//! moves between connections. Nothing here performs I/O.

/// Connection identity.
pub mod connection;

/// Relayed payloads and chat commands.
pub mod message;

/// Synthetic market-tick formatting.
pub mod tick;
