//! Core market data types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Instrument identifier as used by the exchange (e.g. `BTC-USDT`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentId(String);

impl InstrumentId {
    /// Create a new instrument id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw exchange identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstrumentId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Side of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy side, best price is the highest
    Bid,
    /// Sell side, best price is the lowest
    Ask,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => f.write_str("bid"),
            Self::Ask => f.write_str("ask"),
        }
    }
}

/// A single (price, size) pair on one side of the book
///
/// Size 0 means "absent"; books never store zero-size levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Quoted price
    pub price: Decimal,
    /// Visible size at that price
    pub size: Decimal,
}

impl PriceLevel {
    /// Create a new level
    #[must_use]
    pub const fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Event timestamp in epoch milliseconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Ts(u64);

impl Ts {
    /// Create from epoch milliseconds
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Get epoch milliseconds
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Current wall-clock time
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        Self(millis)
    }

    /// Milliseconds elapsed between this timestamp and `later`
    ///
    /// Saturates to 0 when `later` precedes `self` (clock skew).
    #[must_use]
    pub const fn elapsed_ms(&self, later: Self) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_display() {
        let inst = InstrumentId::from("BTC-USDT");
        assert_eq!(inst.to_string(), "BTC-USDT");
        assert_eq!(inst.as_str(), "BTC-USDT");
    }

    #[test]
    fn test_ts_elapsed_saturates() {
        let earlier = Ts::from_millis(1_000);
        let later = Ts::from_millis(1_250);
        assert_eq!(earlier.elapsed_ms(later), 250);
        assert_eq!(later.elapsed_ms(earlier), 0);
    }

    #[test]
    fn test_price_level_exact_decimal() {
        let level = PriceLevel::new(
            "41006.8".parse().unwrap(),
            "0.60038921".parse().unwrap(),
        );
        assert_eq!(level.price.to_string(), "41006.8");
        assert_eq!(level.size.to_string(), "0.60038921");
    }
}
