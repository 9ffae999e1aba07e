//! Limit order book maintenance and microstructure feature derivation
//!
//! The book is rebuilt from a level-2 diff stream: full-replace snapshots
//! followed by incremental upsert/delete updates. All prices and sizes are
//! exact decimals so checksums and derived features reproduce bit-for-bit
//! across runs.

#![warn(missing_docs)]

pub mod book;
pub mod features;
pub mod price_levels;

pub use book::{BookError, OrderBook};
pub use features::{FeatureEngine, FeatureSnapshot};
pub use price_levels::SideBook;
