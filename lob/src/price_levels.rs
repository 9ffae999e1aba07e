//! Price level management for order book sides

use common::{PriceLevel, Side};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// One side of the order book (bid or ask)
///
/// Levels are kept in an ordered map keyed by price, so extracting the
/// top of the book under continuous mutation costs O(depth) rather than
/// a full sort of the side.
#[derive(Clone, Debug)]
pub struct SideBook {
    side: Side,
    levels: BTreeMap<Decimal, Decimal>,
}

impl SideBook {
    /// Create a new empty side
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Which side this is
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Upsert a level, or remove it when `size` is zero
    ///
    /// Duplicate prices overwrite, never append. Callers validate that
    /// `size` is non-negative before reaching this point.
    pub fn update(&mut self, price: Decimal, size: Decimal) {
        if size.is_zero() {
            self.levels.remove(&price);
        } else {
            self.levels.insert(price, size);
        }
    }

    /// Up to `n` levels in the side's ordering: bids descending, asks
    /// ascending by price
    ///
    /// Read-only projection; stored state is never touched.
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<PriceLevel> {
        let mapped = |(price, size): (&Decimal, &Decimal)| PriceLevel::new(*price, *size);
        match self.side {
            Side::Bid => self.levels.iter().rev().take(n).map(mapped).collect(),
            Side::Ask => self.levels.iter().take(n).map(mapped).collect(),
        }
    }

    /// Best level, if any
    #[must_use]
    pub fn best(&self) -> Option<PriceLevel> {
        let entry = match self.side {
            Side::Bid => self.levels.last_key_value(),
            Side::Ask => self.levels.first_key_value(),
        };
        entry.map(|(price, size)| PriceLevel::new(*price, *size))
    }

    /// Number of stored levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the side holds no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Drop every level
    pub fn clear(&mut self) {
        self.levels.clear();
    }
}
