//! Core order book implementation

use crate::price_levels::SideBook;
use common::{InstrumentId, PriceLevel, Side, Ts};
use rust_decimal::Decimal;

/// Default number of levels retained in projections
pub const DEFAULT_DEPTH: usize = 400;

/// Full order book for a single instrument
///
/// One instance lives for the whole stream run and is mutated by exactly
/// one writer (the stream adapter). Reads between apply calls always see a
/// fully-applied state.
#[derive(Clone, Debug)]
pub struct OrderBook {
    /// Instrument this book represents
    pub instrument: InstrumentId,
    /// Timestamp of the last applied event
    pub ts: Ts,
    bids: SideBook,
    asks: SideBook,
    depth: usize,
}

impl OrderBook {
    /// Create a new empty book with the default view depth
    #[must_use]
    pub fn new(instrument: InstrumentId) -> Self {
        Self::with_depth(instrument, DEFAULT_DEPTH)
    }

    /// Create a new empty book with an explicit view depth
    #[must_use]
    pub fn with_depth(instrument: InstrumentId, depth: usize) -> Self {
        Self {
            instrument,
            ts: Ts::default(),
            bids: SideBook::new(Side::Bid),
            asks: SideBook::new(Side::Ask),
            depth,
        }
    }

    /// Configured view depth
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Bid side
    #[must_use]
    pub const fn bids(&self) -> &SideBook {
        &self.bids
    }

    /// Ask side
    #[must_use]
    pub const fn asks(&self) -> &SideBook {
        &self.asks
    }

    /// Replace the whole book with the supplied levels
    ///
    /// Both sides are cleared first; zero-size entries in the snapshot are
    /// dropped, not inserted.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::NegativeSize`] if any level carries a negative
    /// size. Validation runs before any mutation, so a rejected batch
    /// leaves the book untouched.
    pub fn apply_snapshot(
        &mut self,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
        ts: Ts,
    ) -> Result<(), BookError> {
        check_sizes(bids)?;
        check_sizes(asks)?;

        self.bids.clear();
        self.asks.clear();
        self.apply_levels(bids, asks, ts);
        Ok(())
    }

    /// Apply incremental upserts/deletes without clearing existing state
    ///
    /// # Errors
    ///
    /// Returns [`BookError::NegativeSize`] if any level carries a negative
    /// size; the book is left untouched in that case.
    pub fn apply_update(
        &mut self,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
        ts: Ts,
    ) -> Result<(), BookError> {
        check_sizes(bids)?;
        check_sizes(asks)?;

        self.apply_levels(bids, asks, ts);
        Ok(())
    }

    fn apply_levels(&mut self, bids: &[PriceLevel], asks: &[PriceLevel], ts: Ts) {
        for level in bids {
            self.bids.update(level.price, level.size);
        }
        for level in asks {
            self.asks.update(level.price, level.size);
        }
        self.ts = ts;
    }

    /// Sorted (bids, asks) projections, each capped to `depth`
    ///
    /// The cap is whatever the caller asks for, independent of the book's
    /// own configured depth.
    #[must_use]
    pub fn top_levels(&self, depth: usize) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        (self.bids.top(depth), self.asks.top(depth))
    }

    /// Projections at the book's configured depth
    #[must_use]
    pub fn view(&self) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        self.top_levels(self.depth)
    }

    /// Best bid, if any
    #[must_use]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.best()
    }

    /// Best ask, if any
    #[must_use]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.best()
    }

    /// CRC32 over the top-`depth` levels of both sides
    ///
    /// The input string joins `price:size` pairs for bids then asks with
    /// `:`, in each side's sorted order. Comparing the value against an
    /// exchange-supplied checksum is the caller's concern.
    #[must_use]
    pub fn checksum(&self, depth: usize) -> u32 {
        let (bids, asks) = self.top_levels(depth);
        let parts: Vec<String> = bids
            .iter()
            .chain(asks.iter())
            .map(|level| format!("{}:{}", level.price, level.size))
            .collect();
        crc32fast::hash(parts.join(":").as_bytes())
    }
}

fn check_sizes(levels: &[PriceLevel]) -> Result<(), BookError> {
    for level in levels {
        if level.size < Decimal::ZERO {
            return Err(BookError::NegativeSize {
                price: level.price,
                size: level.size,
            });
        }
    }
    Ok(())
}

/// Error types for order book operations
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    /// A level carried a negative size
    #[error("negative size {size} at price {price}")]
    NegativeSize {
        /// Price of the offending level
        price: Decimal,
        /// The negative size
        size: Decimal,
    },
}
