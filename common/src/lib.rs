//! Shared core types for the order-book pipeline
//!
//! Prices, sizes and everything derived from them are exact decimals
//! (`rust_decimal::Decimal`); binary floating point never touches
//! monetary values.

pub mod types;

pub use types::{InstrumentId, PriceLevel, Side, Ts};
