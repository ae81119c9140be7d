//! Relay Messages
//!
//! Payloads are relayed as-is: no sequence numbers, no acknowledgements,
//! no framing beyond what the transport provides. The chat endpoint
//! recognizes exactly one control command, `/count`.

use std::fmt;

/// Literal control command that asks for the number of chat clients.
pub const COUNT_COMMAND: &str = "/count";

// =============================================================================
// Payload
// =============================================================================

/// An immutable message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Payload {
    /// Create a text payload.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// View the payload as text.
    ///
    /// Binary payloads are returned only if they are valid UTF-8.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(bytes) => std::str::from_utf8(bytes).ok(),
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Check if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame kind label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

// =============================================================================
// Chat Commands
// =============================================================================

/// Control commands understood by the chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    /// Report the number of connected chat clients to the sender.
    Count,
}

impl ChatCommand {
    /// Parse a payload as a command.
    ///
    /// Surrounding whitespace is ignored; the remainder must match exactly
    /// (case-sensitive). Anything else is ordinary chat content.
    #[must_use]
    pub fn parse(payload: &Payload) -> Option<Self> {
        match payload.as_text()?.trim() {
            COUNT_COMMAND => Some(Self::Count),
            _ => None,
        }
    }
}

/// Reply text for the `/count` command.
#[must_use]
pub fn count_reply(count: usize) -> String {
    format!("Connected clients: {count}")
}
