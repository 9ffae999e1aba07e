//! Microstructure feature extraction from order book views
//!
//! The engine compares the current top-N window against the previously
//! computed one, so its cost is bounded by the window depth and is
//! independent of how deep the book itself runs.

use common::PriceLevel;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Feature values derived from one tick's window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSnapshot {
    /// Order flow imbalance: net size change at matching prices, bid minus ask
    pub ofi: Decimal,
    /// Weighted market pressure: rank-decayed size sums, bid minus ask
    pub wmp: Decimal,
    /// Signed depth imbalance in [-1, 1]; negative means the bid side is thinner
    pub liquidity_vacuum: Decimal,
    /// Unweighted bid size sum over the window
    pub bid_pressure: Decimal,
    /// Unweighted ask size sum over the window
    pub ask_pressure: Decimal,
}

/// Stateful feature engine over a fixed top-N window
///
/// Retains only the previous tick's window per side, replaced after every
/// [`compute`](Self::compute) call whether or not downstream consumed the
/// result.
#[derive(Debug)]
pub struct FeatureEngine {
    depth: usize,
    prev_bids: Vec<PriceLevel>,
    prev_asks: Vec<PriceLevel>,
}

impl FeatureEngine {
    /// Create an engine with the given window depth (clamped to at least 1)
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            prev_bids: Vec::new(),
            prev_asks: Vec::new(),
        }
    }

    /// Configured window depth
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Compute features for the current window
    ///
    /// Total: empty sides yield zero-valued metrics, never an error. The
    /// output is a pure function of the inputs and the stored previous
    /// window.
    pub fn compute(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) -> FeatureSnapshot {
        let bids = &bids[..bids.len().min(self.depth)];
        let asks = &asks[..asks.len().min(self.depth)];

        let ofi = side_delta(&self.prev_bids, bids) - side_delta(&self.prev_asks, asks);
        let wmp = self.weighted_pressure(bids) - self.weighted_pressure(asks);
        let bid_pressure = depth_sum(bids);
        let ask_pressure = depth_sum(asks);
        let liquidity_vacuum = liquidity_vacuum(bids, asks, bid_pressure, ask_pressure);

        self.prev_bids = bids.to_vec();
        self.prev_asks = asks.to_vec();

        FeatureSnapshot {
            ofi,
            wmp,
            liquidity_vacuum,
            bid_pressure,
            ask_pressure,
        }
    }

    /// Forget the stored previous window
    pub fn reset(&mut self) {
        self.prev_bids.clear();
        self.prev_asks.clear();
    }

    /// Rank-decayed size sum: level at rank r (1 = best) weighs (N - r + 1) / N
    fn weighted_pressure(&self, side: &[PriceLevel]) -> Decimal {
        let n = decimal_from_usize(self.depth);
        side.iter()
            .enumerate()
            .map(|(idx, level)| {
                let weight = decimal_from_usize(self.depth - idx) / n;
                level.size * weight
            })
            .sum()
    }
}

/// Net size change for every price present in the current window
///
/// Prices that disappeared are not counted; their removal shows up in the
/// next window's composition instead. The ordered current window drives
/// iteration, never map order.
fn side_delta(prev: &[PriceLevel], current: &[PriceLevel]) -> Decimal {
    let prev_sizes: FxHashMap<Decimal, Decimal> =
        prev.iter().map(|level| (level.price, level.size)).collect();

    current
        .iter()
        .map(|level| level.size - prev_sizes.get(&level.price).copied().unwrap_or_default())
        .sum()
}

fn depth_sum(side: &[PriceLevel]) -> Decimal {
    side.iter().map(|level| level.size).sum()
}

fn liquidity_vacuum(
    bids: &[PriceLevel],
    asks: &[PriceLevel],
    bid_depth: Decimal,
    ask_depth: Decimal,
) -> Decimal {
    if bids.is_empty() || asks.is_empty() {
        return Decimal::ZERO;
    }
    let total = bid_depth + ask_depth;
    if total.is_zero() {
        return Decimal::ZERO;
    }
    (bid_depth - ask_depth) / total
}

fn decimal_from_usize(value: usize) -> Decimal {
    Decimal::from(u64::try_from(value).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lvl(price: &str, size: &str) -> PriceLevel {
        PriceLevel::new(price.parse().unwrap(), size.parse().unwrap())
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_windows_yield_zero_metrics() {
        let mut engine = FeatureEngine::new(25);
        let snap = engine.compute(&[], &[]);

        assert_eq!(snap.ofi, Decimal::ZERO);
        assert_eq!(snap.wmp, Decimal::ZERO);
        assert_eq!(snap.liquidity_vacuum, Decimal::ZERO);
        assert_eq!(snap.bid_pressure, Decimal::ZERO);
        assert_eq!(snap.ask_pressure, Decimal::ZERO);
    }

    #[test]
    fn test_ofi_zero_for_identical_windows() {
        let mut engine = FeatureEngine::new(25);
        let bids = [lvl("100", "2"), lvl("99", "3")];
        let asks = [lvl("101", "1")];

        engine.compute(&bids, &asks);
        let snap = engine.compute(&bids, &asks);
        assert_eq!(snap.ofi, Decimal::ZERO);
    }

    #[test]
    fn test_ofi_tracks_size_changes_at_matching_prices() {
        let mut engine = FeatureEngine::new(25);
        engine.compute(&[lvl("100", "2")], &[lvl("101", "5")]);

        // Bid grows by 3, ask shrinks by 2: OFI = 3 - (-2) = 5.
        let snap = engine.compute(&[lvl("100", "5")], &[lvl("101", "3")]);
        assert_eq!(snap.ofi, dec("5"));
    }

    #[test]
    fn test_ofi_ignores_disappeared_prices() {
        let mut engine = FeatureEngine::new(25);
        engine.compute(&[lvl("100", "2"), lvl("99", "4")], &[]);

        // 99 vanished; only the surviving price contributes.
        let snap = engine.compute(&[lvl("100", "2")], &[]);
        assert_eq!(snap.ofi, Decimal::ZERO);
    }

    #[test]
    fn test_new_price_counts_full_size() {
        let mut engine = FeatureEngine::new(25);
        engine.compute(&[lvl("100", "2")], &[]);

        let snap = engine.compute(&[lvl("100", "2"), lvl("99.5", "4")], &[]);
        assert_eq!(snap.ofi, dec("4"));
    }

    #[test]
    fn test_liquidity_vacuum_scenario() {
        let mut engine = FeatureEngine::new(25);
        let snap = engine.compute(
            &[lvl("100", "1"), lvl("99", "2")],
            &[lvl("101", "2"), lvl("102", "3")],
        );

        // (3 - 5) / (3 + 5) = -0.25
        assert_eq!(snap.liquidity_vacuum, dec("-0.25"));
        assert_eq!(snap.bid_pressure, dec("3"));
        assert_eq!(snap.ask_pressure, dec("5"));
    }

    #[test]
    fn test_vacuum_zero_when_one_side_empty() {
        let mut engine = FeatureEngine::new(25);
        let snap = engine.compute(&[lvl("100", "3")], &[]);
        assert_eq!(snap.liquidity_vacuum, Decimal::ZERO);
    }

    #[test]
    fn test_wmp_rank_weights() {
        let mut engine = FeatureEngine::new(3);
        let snap = engine.compute(
            &[lvl("100", "2"), lvl("99", "1"), lvl("98", "1")],
            &[],
        );

        // Weights 3/3, 2/3, 1/3: 2 + 2/3 + 1/3 = 3.
        assert_eq!(snap.wmp, dec("3"));
    }

    #[test]
    fn test_window_truncates_to_engine_depth() {
        let mut engine = FeatureEngine::new(2);
        let bids = [lvl("100", "1"), lvl("99", "1"), lvl("98", "10")];
        let snap = engine.compute(&bids, &[]);

        // The third level is outside the window.
        assert_eq!(snap.bid_pressure, dec("2"));
    }

    #[test]
    fn test_previous_window_replaced_every_call() {
        let mut engine = FeatureEngine::new(25);
        engine.compute(&[lvl("100", "2")], &[]);
        engine.compute(&[lvl("100", "6")], &[]);

        // Previous is now size 6, not 2.
        let snap = engine.compute(&[lvl("100", "7")], &[]);
        assert_eq!(snap.ofi, dec("1"));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut engine = FeatureEngine::new(25);
        engine.compute(&[lvl("100", "2")], &[]);
        engine.reset();

        let snap = engine.compute(&[lvl("100", "2")], &[]);
        assert_eq!(snap.ofi, dec("2"));
    }

    #[test]
    fn test_deterministic_across_engines() {
        let bids = [lvl("100.5", "1.25"), lvl("100", "0.75")];
        let asks = [lvl("101", "2.5")];

        let mut a = FeatureEngine::new(10);
        let mut b = FeatureEngine::new(10);
        a.compute(&bids, &asks);
        b.compute(&bids, &asks);

        assert_eq!(a.compute(&bids, &asks), b.compute(&bids, &asks));
    }
}
