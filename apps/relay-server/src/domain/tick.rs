//! Synthetic Market Ticks
//!
//! The order book endpoint streams placeholder trades. Only the timestamp
//! varies; price and quantity are fixed.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use rust_decimal::Decimal;

/// Placeholder trade price.
pub const PLACEHOLDER_PRICE: Decimal = Decimal::ONE_HUNDRED;

/// Placeholder trade quantity.
pub const PLACEHOLDER_QUANTITY: Decimal = Decimal::ONE_HUNDRED;

/// A single synthetic trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    timestamp: DateTime<FixedOffset>,
    price: Decimal,
    quantity: Decimal,
}

impl Tick {
    /// Create a tick at the given time with placeholder price and quantity.
    #[must_use]
    pub const fn new(timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp,
            price: PLACEHOLDER_PRICE,
            quantity: PLACEHOLDER_QUANTITY,
        }
    }

    /// Create a tick for the current local time.
    #[must_use]
    pub fn now() -> Self {
        Self::new(Local::now().fixed_offset())
    }

    /// Trade timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> &DateTime<FixedOffset> {
        &self.timestamp
    }

    /// Trade price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Trade quantity.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }
}

impl fmt::Display for Tick {
    // Millisecond precision, `Z` for a zero offset and `+hh:mm` otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Time of trade: {}, Price: {}, Quantity: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.price,
            self.quantity
        )
    }
}
