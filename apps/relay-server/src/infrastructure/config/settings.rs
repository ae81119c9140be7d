//! Relay Configuration Settings
//!
//! Configuration types for the relay, loaded from environment variables.
//! Unparseable numbers fall back to their defaults; values that parse but
//! make no sense are rejected.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Address to bind.
    pub bind_addr: IpAddr,
    /// Port serving the WebSocket, health, and metrics routes.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
        }
    }
}

impl ServerSettings {
    /// Socket address to listen on.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Per-session behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Interval between ticks on the order book endpoint.
    pub tick_interval: Duration,
    /// Pause after a non end-of-stream chat read error.
    pub read_error_backoff: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            read_error_backoff: Duration::from_millis(100),
        }
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayConfig {
    /// Listener settings.
    pub server: ServerSettings,
    /// Session settings.
    pub session: SessionSettings,
}

impl RelayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `RELAY_BIND_ADDR` is not an IP address or if
    /// `RELAY_TICK_INTERVAL_SECS` is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`RelayConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = match lookup("RELAY_BIND_ADDR") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RELAY_BIND_ADDR".to_string(), value))?,
            None => defaults.server.bind_addr,
        };

        let server = ServerSettings {
            bind_addr,
            port: parse_or(&lookup, "RELAY_PORT", defaults.server.port),
        };

        let tick_interval = parse_opt::<u64>(&lookup, "RELAY_TICK_INTERVAL_SECS")
            .map_or(defaults.session.tick_interval, Duration::from_secs);
        if tick_interval.is_zero() {
            return Err(ConfigError::ZeroInterval(
                "RELAY_TICK_INTERVAL_SECS".to_string(),
            ));
        }

        let read_error_backoff = parse_opt::<u64>(&lookup, "RELAY_READ_ERROR_BACKOFF_MS")
            .map_or(defaults.session.read_error_backoff, Duration::from_millis);

        Ok(Self {
            server,
            session: SessionSettings {
                tick_interval,
                read_error_backoff,
            },
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set to a value that cannot be used.
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
    /// Interval variable is zero.
    #[error("{0} must be greater than zero")]
    ZeroInterval(String),
}

fn parse_opt<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.parse().ok())
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    parse_opt(lookup, key).unwrap_or(default)
}
