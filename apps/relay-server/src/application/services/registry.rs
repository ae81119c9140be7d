//! Connection Registry
//!
//! Tracks the chat connections that are currently live so the broadcaster
//! can fan messages out to them.
//!
//! # Design
//!
//! The registry holds non-owning (`Weak`) references: each connection is
//! owned by exactly one session, and membership tracks that session's
//! lifetime. Snapshots copy the live members out under a read lock, so
//! writes to peers never happen while the lock is held and concurrent
//! add/remove calls cannot disturb an iteration in progress.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::application::ports::Connection;
use crate::domain::connection::ConnectionId;
use crate::infrastructure::metrics;

/// Shared registry reference.
pub type SharedRegistry = Arc<ConnectionRegistry>;

/// Set of live chat connections keyed by identity.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Weak<dyn Connection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Adding one that is already present is a no-op.
    pub fn add(&self, connection: &Arc<dyn Connection>) {
        let count = {
            let mut connections = self.connections.write();
            connections
                .entry(connection.id())
                .or_insert_with(|| Arc::downgrade(connection));
            // Published under the lock so the last write matches the map.
            metrics::set_chat_connections(connections.len());
            connections.len()
        };

        tracing::debug!(connection_id = %connection.id(), count, "Connection registered");
    }

    /// Unregister a connection.
    ///
    /// Returns `true` if it was present. Removing an absent connection is a
    /// no-op so cleanup paths can call this unconditionally.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let (removed, count) = {
            let mut connections = self.connections.write();
            let removed = connections.remove(&id).is_some();
            if removed {
                metrics::set_chat_connections(connections.len());
            }
            (removed, connections.len())
        };

        if removed {
            tracing::debug!(connection_id = %id, count, "Connection unregistered");
        }
        removed
    }

    /// Check whether a connection is registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().contains_key(&id)
    }

    /// All live connections other than `origin`, as of this call.
    ///
    /// Members added or removed after the call returns are not reflected.
    #[must_use]
    pub fn snapshot_excluding(&self, origin: ConnectionId) -> Vec<Arc<dyn Connection>> {
        self.connections
            .read()
            .iter()
            .filter(|(id, _)| **id != origin)
            .filter_map(|(_, connection)| connection.upgrade())
            .collect()
    }

    /// Number of registered connections.
    #[must_use]
    pub fn count(&self) -> usize {
        self.connections.read().len()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("count", &self.count())
            .finish()
    }
}
