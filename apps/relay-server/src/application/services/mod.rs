//! Application Services
//!
//! Services that drive connections through their lifecycles.
//!
//! - `ConnectionRegistry`: the set of live chat connections
//! - `Broadcaster`: best-effort fan-out to every chat peer but the sender
//! - `ChatSession`: per-connection chat read loop and command dispatch
//! - `TickerSession`: per-connection synthetic market-data stream

/// Chat session lifecycle.
pub mod chat;

/// Broadcast fan-out.
pub mod broadcaster;

/// Live connection registry.
pub mod registry;

/// Ticker session lifecycle.
pub mod ticker;

pub use broadcaster::Broadcaster;
pub use chat::ChatSession;
pub use registry::{ConnectionRegistry, SharedRegistry};
pub use ticker::TickerSession;
