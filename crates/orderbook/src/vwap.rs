//! Slippage-bounded VWAP sizing.
//!
//! The walk answers one question: how much can be executed against this
//! book while the volume-weighted fill price stays within tolerance of the
//! best quote? Levels are accepted or rejected whole — a level whose
//! inclusion would breach the slippage bound is dropped entirely, trading
//! size for safety.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::book::{L2OrderBook, OrderBookLevel, Side};

// =============================================================================
// Configuration
// =============================================================================

/// Sizing parameters, owned by the caller and passed into every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderbookConfig {
    /// Fraction of displayed depth assumed actually fillable, in (0, 1].
    /// Default: 0.5
    pub liquidity_factor: Decimal,

    /// Maximum acceptable slippage versus the best quote, in cents.
    /// Default: 2
    pub max_slippage_cents: u32,

    /// Maximum number of levels to walk.
    /// Default: 5
    pub max_depth: usize,

    /// Minimum combined size for a hedged pair to be executable (USD).
    /// Default: $50
    pub min_liquidity_usd: Decimal,
}

impl Default for OrderbookConfig {
    fn default() -> Self {
        Self {
            liquidity_factor: dec!(0.5),
            max_slippage_cents: 2,
            max_depth: 5,
            min_liquidity_usd: dec!(50),
        }
    }
}

impl OrderbookConfig {
    /// Tighter sizing for thin or unproven markets.
    ///
    /// - Liquidity factor: 0.25
    /// - Max slippage: 1 cent
    /// - Max depth: 3 levels
    /// - Min pair liquidity: $100
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            liquidity_factor: dec!(0.25),
            max_slippage_cents: 1,
            max_depth: 3,
            min_liquidity_usd: dec!(100),
        }
    }

    /// Looser sizing for deep, liquid markets.
    ///
    /// - Liquidity factor: 0.75
    /// - Max slippage: 3 cents
    /// - Max depth: 10 levels
    /// - Min pair liquidity: $25
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            liquidity_factor: dec!(0.75),
            max_slippage_cents: 3,
            max_depth: 10,
            min_liquidity_usd: dec!(25),
        }
    }

    /// Builder method to set the liquidity factor.
    ///
    /// # Panics
    ///
    /// Panics unless the factor is in (0, 1].
    #[must_use]
    pub fn with_liquidity_factor(mut self, factor: Decimal) -> Self {
        self.liquidity_factor = factor;
        self.assert_valid();
        self
    }

    /// Builder method to set the maximum slippage.
    #[must_use]
    pub fn with_max_slippage_cents(mut self, cents: u32) -> Self {
        self.max_slippage_cents = cents;
        self
    }

    /// Builder method to set the maximum walk depth.
    ///
    /// # Panics
    ///
    /// Panics if the depth is zero.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self.assert_valid();
        self
    }

    /// Builder method to set the minimum pair liquidity.
    ///
    /// # Panics
    ///
    /// Panics if the minimum is negative.
    #[must_use]
    pub fn with_min_liquidity_usd(mut self, min: Decimal) -> Self {
        self.min_liquidity_usd = min;
        self.assert_valid();
        self
    }

    /// A malformed config is a caller bug, not a market condition.
    pub(crate) fn assert_valid(&self) {
        assert!(
            self.liquidity_factor > Decimal::ZERO && self.liquidity_factor <= Decimal::ONE,
            "liquidity_factor {} outside (0, 1]",
            self.liquidity_factor
        );
        assert!(self.max_depth > 0, "max_depth must be at least 1");
        assert!(
            self.min_liquidity_usd >= Decimal::ZERO,
            "negative min_liquidity_usd {}",
            self.min_liquidity_usd
        );
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of a single-leg sizing walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VwapResult {
    /// Executable size: min(accepted liquidity, requested target), USD.
    pub optimal_size_usd: Decimal,

    /// Volume-weighted price over the accepted levels, cents.
    pub vwap_cents: Decimal,

    /// VWAP distance from the best quote, cents. Never exceeds the
    /// configured maximum.
    pub slippage_cents: Decimal,

    /// Total discounted liquidity accepted by the walk, USD.
    pub total_liquidity_usd: Decimal,

    /// Number of levels accepted.
    pub levels_consumed: usize,

    /// Cost of executing the optimal size at the VWAP, USD.
    pub execution_cost_usd: Decimal,
}

impl VwapResult {
    /// A zero-valued result for empty or unusable books.
    #[must_use]
    pub fn zero(vwap_cents: Decimal) -> Self {
        Self {
            optimal_size_usd: Decimal::ZERO,
            vwap_cents,
            slippage_cents: Decimal::ZERO,
            total_liquidity_usd: Decimal::ZERO,
            levels_consumed: 0,
            execution_cost_usd: Decimal::ZERO,
        }
    }

    /// Returns true if the walk found any executable size.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.optimal_size_usd > Decimal::ZERO
    }
}

/// Combined sizing for the two legs of a hedged pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageVwap {
    /// Sizing for the YES leg.
    pub yes_leg: VwapResult,

    /// Sizing for the NO leg.
    pub no_leg: VwapResult,

    /// min of the two legs' optimal sizes; a hedge cannot be lopsided.
    pub combined_optimal_size_usd: Decimal,

    /// Sum of both legs' slippage, cents.
    pub total_slippage_cents: Decimal,

    /// True when the combined size meets the liquidity minimum and the
    /// combined slippage fits within 2x the single-leg allowance.
    pub can_execute: bool,
}

// =============================================================================
// Sizing Walk
// =============================================================================

/// Sizes a buy against the ask side of the book.
///
/// # Panics
///
/// Panics on a negative target size or malformed config (caller bugs).
/// Empty, sentinel-topped, or otherwise unusable books return a
/// zero-valued result instead.
#[must_use]
pub fn calculate_buy_vwap(
    book: &L2OrderBook,
    target_size_usd: Decimal,
    config: &OrderbookConfig,
) -> VwapResult {
    walk_levels(&book.asks, Side::Buy, target_size_usd, config)
}

/// Sizes a sell against the bid side of the book.
///
/// # Panics
///
/// Panics on a negative target size or malformed config.
#[must_use]
pub fn calculate_sell_vwap(
    book: &L2OrderBook,
    target_size_usd: Decimal,
    config: &OrderbookConfig,
) -> VwapResult {
    walk_levels(&book.bids, Side::Sell, target_size_usd, config)
}

/// Sizes both legs of a hedged pair and combines them.
///
/// Each leg is a buy-side walk of its own book. The pair trades at the
/// smaller leg's size, accumulates both legs' slippage, and is executable
/// only if it clears `min_liquidity_usd` and twice the single-leg
/// slippage allowance.
#[must_use]
pub fn calculate_arbitrage_vwap(
    yes_book: &L2OrderBook,
    no_book: &L2OrderBook,
    target_size_usd: Decimal,
    config: &OrderbookConfig,
) -> ArbitrageVwap {
    let yes_leg = calculate_buy_vwap(yes_book, target_size_usd, config);
    let no_leg = calculate_buy_vwap(no_book, target_size_usd, config);

    let combined_optimal_size_usd = yes_leg.optimal_size_usd.min(no_leg.optimal_size_usd);
    let total_slippage_cents = yes_leg.slippage_cents + no_leg.slippage_cents;

    // Two independent legs get double the single-leg slippage allowance.
    let slippage_allowance = Decimal::from(config.max_slippage_cents) * dec!(2);
    let can_execute = combined_optimal_size_usd >= config.min_liquidity_usd
        && total_slippage_cents <= slippage_allowance;

    debug!(
        combined_size = %combined_optimal_size_usd,
        total_slippage = %total_slippage_cents,
        can_execute,
        "combined pair sizing"
    );

    ArbitrageVwap {
        yes_leg,
        no_leg,
        combined_optimal_size_usd,
        total_slippage_cents,
        can_execute,
    }
}

/// The slippage-bounded walk itself: an explicit fold over the immutable
/// level sequence. Each candidate level is evaluated with the VWAP it
/// would produce; a breach rejects the whole level and stops the walk.
fn walk_levels(
    levels: &[OrderBookLevel],
    side: Side,
    target_size_usd: Decimal,
    config: &OrderbookConfig,
) -> VwapResult {
    assert!(
        target_size_usd >= Decimal::ZERO,
        "negative target size {target_size_usd}"
    );
    config.assert_valid();

    let best_cents = match levels.first().filter(|level| !level.is_sentinel()) {
        Some(level) => Decimal::from(level.price_cents),
        None => return VwapResult::zero(Decimal::ZERO),
    };
    if target_size_usd == Decimal::ZERO {
        return VwapResult::zero(best_cents);
    }

    let max_slippage = Decimal::from(config.max_slippage_cents);
    let mut accepted_size = Decimal::ZERO;
    let mut accepted_cost = Decimal::ZERO;
    let mut levels_consumed = 0usize;

    for level in levels.iter().take(config.max_depth) {
        if level.is_sentinel() {
            break;
        }

        let usable_size = level.size_usd * config.liquidity_factor;
        let candidate_size = accepted_size + usable_size;
        let candidate_cost = accepted_cost + Decimal::from(level.price_cents) * usable_size;
        let candidate_vwap = candidate_cost / candidate_size;
        let candidate_slippage = match side {
            Side::Buy => candidate_vwap - best_cents,
            Side::Sell => best_cents - candidate_vwap,
        };

        if candidate_slippage > max_slippage {
            trace!(
                side = %side,
                price = level.price_cents,
                slippage = %candidate_slippage,
                max = config.max_slippage_cents,
                "level rejected, slippage over tolerance"
            );
            break;
        }

        accepted_size = candidate_size;
        accepted_cost = candidate_cost;
        levels_consumed += 1;

        if accepted_size >= target_size_usd {
            break;
        }
    }

    if levels_consumed == 0 {
        return VwapResult::zero(best_cents);
    }

    let vwap_cents = accepted_cost / accepted_size;
    let slippage_cents = match side {
        Side::Buy => vwap_cents - best_cents,
        Side::Sell => best_cents - vwap_cents,
    }
    .max(Decimal::ZERO);
    let optimal_size_usd = accepted_size.min(target_size_usd);
    let execution_cost_usd = optimal_size_usd * vwap_cents / dec!(100);

    trace!(
        side = %side,
        optimal = %optimal_size_usd,
        vwap = %vwap_cents,
        slippage = %slippage_cents,
        levels = levels_consumed,
        "sizing walk complete"
    );

    VwapResult {
        optimal_size_usd,
        vwap_cents,
        slippage_cents,
        total_liquidity_usd: accepted_size,
        levels_consumed,
        execution_cost_usd,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ask_book(levels: Vec<(u32, Decimal)>) -> L2OrderBook {
        let asks = levels
            .into_iter()
            .map(|(price, size)| OrderBookLevel::new(price, size))
            .collect();
        L2OrderBook::new(vec![], asks, Utc::now())
    }

    fn bid_book(levels: Vec<(u32, Decimal)>) -> L2OrderBook {
        let bids = levels
            .into_iter()
            .map(|(price, size)| OrderBookLevel::new(price, size))
            .collect();
        L2OrderBook::new(bids, vec![], Utc::now())
    }

    // ==================== Configuration Tests ====================

    #[test]
    fn test_config_default_values() {
        let config = OrderbookConfig::default();

        assert_eq!(config.liquidity_factor, dec!(0.5));
        assert_eq!(config.max_slippage_cents, 2);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.min_liquidity_usd, dec!(50));
    }

    #[test]
    fn test_config_builder_methods() {
        let config = OrderbookConfig::default()
            .with_liquidity_factor(dec!(1))
            .with_max_slippage_cents(5)
            .with_max_depth(8)
            .with_min_liquidity_usd(dec!(10));

        assert_eq!(config.liquidity_factor, dec!(1));
        assert_eq!(config.max_slippage_cents, 5);
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.min_liquidity_usd, dec!(10));
    }

    #[test]
    #[should_panic(expected = "liquidity_factor")]
    fn test_config_rejects_zero_factor() {
        let _ = OrderbookConfig::default().with_liquidity_factor(dec!(0));
    }

    #[test]
    #[should_panic(expected = "liquidity_factor")]
    fn test_config_rejects_factor_above_one() {
        let _ = OrderbookConfig::default().with_liquidity_factor(dec!(1.5));
    }

    #[test]
    #[should_panic(expected = "max_depth")]
    fn test_config_rejects_zero_depth() {
        let _ = OrderbookConfig::default().with_max_depth(0);
    }

    // ==================== Single-Leg Walk Tests ====================

    #[test]
    fn test_single_level_fills_target() {
        // Single ask 52c x $1000, default config, target $500:
        // usable depth 500, no slippage possible.
        let book = ask_book(vec![(52, dec!(1000))]);
        let result = calculate_buy_vwap(&book, dec!(500), &OrderbookConfig::default());

        assert_eq!(result.optimal_size_usd, dec!(500));
        assert_eq!(result.vwap_cents, dec!(52));
        assert_eq!(result.slippage_cents, dec!(0));
        assert_eq!(result.levels_consumed, 1);
        assert_eq!(result.execution_cost_usd, dec!(260));
    }

    #[test]
    fn test_violating_level_rejected_whole() {
        // [(50c, $100), (55c, $500)], factor 0.5, max slippage 2c,
        // target $300. Level 1 contributes $50 at no slippage; including
        // level 2 would put the VWAP at 54.17c (slippage 4.17c), so the
        // whole level is dropped.
        let book = ask_book(vec![(50, dec!(100)), (55, dec!(500))]);
        let result = calculate_buy_vwap(&book, dec!(300), &OrderbookConfig::default());

        assert_eq!(result.optimal_size_usd, dec!(50));
        assert_eq!(result.vwap_cents, dec!(50));
        assert_eq!(result.slippage_cents, dec!(0));
        assert_eq!(result.levels_consumed, 1);
        assert_eq!(result.total_liquidity_usd, dec!(50));
    }

    #[test]
    fn test_multiple_levels_within_tolerance() {
        let config = OrderbookConfig::default();
        let book = ask_book(vec![(52, dec!(1000)), (54, dec!(500))]);
        let result = calculate_buy_vwap(&book, dec!(1200), &config);

        // 500 @ 52 + 250 @ 54 = 39500 cents-usd over $750.
        let expected_vwap = dec!(39500) / dec!(750);
        assert_eq!(result.levels_consumed, 2);
        assert_eq!(result.total_liquidity_usd, dec!(750));
        assert_eq!(result.optimal_size_usd, dec!(750));
        assert_eq!(result.vwap_cents, expected_vwap);
        assert_eq!(result.slippage_cents, expected_vwap - dec!(52));
    }

    #[test]
    fn test_walk_stops_at_target() {
        let config = OrderbookConfig::default().with_liquidity_factor(dec!(1));
        let book = ask_book(vec![(50, dec!(400)), (51, dec!(400)), (52, dec!(400))]);
        let result = calculate_buy_vwap(&book, dec!(600), &config);

        // Second level reaches the target; third never evaluated.
        assert_eq!(result.levels_consumed, 2);
        assert_eq!(result.optimal_size_usd, dec!(600));
        assert_eq!(result.total_liquidity_usd, dec!(800));
    }

    #[test]
    fn test_sell_walk_measures_slippage_downward() {
        let config = OrderbookConfig::default().with_liquidity_factor(dec!(1));
        let book = bid_book(vec![(48, dec!(100)), (47, dec!(200))]);
        let result = calculate_sell_vwap(&book, dec!(150), &config);

        // 100 @ 48 + 200 @ 47 = 14200 cents-usd over $300.
        let expected_vwap = dec!(14200) / dec!(300);
        assert_eq!(result.optimal_size_usd, dec!(150));
        assert_eq!(result.vwap_cents, expected_vwap);
        assert_eq!(result.slippage_cents, dec!(48) - expected_vwap);
        assert_eq!(result.levels_consumed, 2);
    }

    #[test]
    fn test_max_depth_bounds_walk() {
        let config = OrderbookConfig::default()
            .with_liquidity_factor(dec!(1))
            .with_max_depth(1);
        let book = ask_book(vec![(50, dec!(100)), (50, dec!(100))]);
        let result = calculate_buy_vwap(&book, dec!(500), &config);

        assert_eq!(result.levels_consumed, 1);
        assert_eq!(result.optimal_size_usd, dec!(100));
    }

    #[test]
    fn test_sentinel_level_terminates_walk() {
        let config = OrderbookConfig::default().with_liquidity_factor(dec!(1));
        let book = ask_book(vec![(50, dec!(100)), (0, dec!(500)), (51, dec!(500))]);
        let result = calculate_buy_vwap(&book, dec!(500), &config);

        assert_eq!(result.levels_consumed, 1);
        assert_eq!(result.optimal_size_usd, dec!(100));
    }

    // ==================== Degenerate Input Tests ====================

    #[test]
    fn test_empty_book_returns_zero_result() {
        let book = ask_book(vec![]);
        let result = calculate_buy_vwap(&book, dec!(500), &OrderbookConfig::default());

        assert_eq!(result, VwapResult::zero(dec!(0)));
        assert!(!result.is_executable());
    }

    #[test]
    fn test_sentinel_best_quote_returns_zero_result() {
        let book = ask_book(vec![(0, dec!(1000))]);
        let result = calculate_buy_vwap(&book, dec!(500), &OrderbookConfig::default());

        assert_eq!(result.optimal_size_usd, dec!(0));
        assert_eq!(result.levels_consumed, 0);
    }

    #[test]
    fn test_zero_target_consumes_no_levels() {
        let book = ask_book(vec![(52, dec!(1000))]);
        let result = calculate_buy_vwap(&book, dec!(0), &OrderbookConfig::default());

        assert_eq!(result.optimal_size_usd, dec!(0));
        assert_eq!(result.levels_consumed, 0);
        assert_eq!(result.vwap_cents, dec!(52));
    }

    #[test]
    #[should_panic(expected = "negative target size")]
    fn test_negative_target_panics() {
        let book = ask_book(vec![(52, dec!(1000))]);
        let _ = calculate_buy_vwap(&book, dec!(-1), &OrderbookConfig::default());
    }

    // ==================== Invariant Tests ====================

    #[test]
    fn test_optimal_size_never_exceeds_target_or_liquidity() {
        let config = OrderbookConfig::default();
        let book = ask_book(vec![(50, dec!(300)), (51, dec!(300)), (52, dec!(300))]);

        for target in [dec!(10), dec!(100), dec!(450), dec!(10000)] {
            let result = calculate_buy_vwap(&book, target, &config);
            assert!(result.optimal_size_usd <= target);
            assert!(result.optimal_size_usd <= result.total_liquidity_usd);
        }
    }

    #[test]
    fn test_slippage_never_exceeds_configured_max() {
        let config = OrderbookConfig::default().with_liquidity_factor(dec!(1));
        let book = ask_book(vec![
            (50, dec!(100)),
            (51, dec!(100)),
            (53, dec!(100)),
            (60, dec!(100)),
        ]);

        for target in [dec!(50), dec!(150), dec!(250), dec!(400)] {
            let result = calculate_buy_vwap(&book, target, &config);
            assert!(result.slippage_cents >= dec!(0));
            assert!(result.slippage_cents <= Decimal::from(config.max_slippage_cents));
        }
    }

    // ==================== Two-Leg Combination Tests ====================

    #[test]
    fn test_combined_size_is_min_of_legs() {
        let config = OrderbookConfig::default();
        let yes_book = ask_book(vec![(45, dec!(1000))]);
        let no_book = ask_book(vec![(52, dec!(400))]);

        let combined = calculate_arbitrage_vwap(&yes_book, &no_book, dec!(400), &config);

        assert_eq!(combined.yes_leg.optimal_size_usd, dec!(400));
        assert_eq!(combined.no_leg.optimal_size_usd, dec!(200));
        assert_eq!(combined.combined_optimal_size_usd, dec!(200));
        assert_eq!(combined.total_slippage_cents, dec!(0));
        assert!(combined.can_execute);
    }

    #[test]
    fn test_combined_slippage_is_sum_of_legs() {
        let config = OrderbookConfig::default().with_liquidity_factor(dec!(1));
        let yes_book = ask_book(vec![(50, dec!(100)), (52, dec!(100))]);
        let no_book = ask_book(vec![(40, dec!(100)), (42, dec!(100))]);

        let combined = calculate_arbitrage_vwap(&yes_book, &no_book, dec!(200), &config);

        assert_eq!(
            combined.total_slippage_cents,
            combined.yes_leg.slippage_cents + combined.no_leg.slippage_cents
        );
        assert_eq!(combined.total_slippage_cents, dec!(2));
        assert!(combined.can_execute);
    }

    #[test]
    fn test_pair_below_min_liquidity_not_executable() {
        let config = OrderbookConfig::default();
        let yes_book = ask_book(vec![(45, dec!(40))]);
        let no_book = ask_book(vec![(52, dec!(40))]);

        let combined = calculate_arbitrage_vwap(&yes_book, &no_book, dec!(100), &config);

        // Each leg offers $20 after discounting, below the $50 minimum.
        assert_eq!(combined.combined_optimal_size_usd, dec!(20));
        assert!(!combined.can_execute);
    }

    #[test]
    fn test_pair_with_empty_leg_not_executable() {
        let config = OrderbookConfig::default();
        let yes_book = ask_book(vec![(45, dec!(1000))]);
        let no_book = ask_book(vec![]);

        let combined = calculate_arbitrage_vwap(&yes_book, &no_book, dec!(100), &config);

        assert_eq!(combined.combined_optimal_size_usd, dec!(0));
        assert!(!combined.can_execute);
    }

    // ==================== Serialization Tests ====================

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = OrderbookConfig::aggressive();
        let json = serde_json::to_string(&config).unwrap();
        let back: OrderbookConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_result_serialization() {
        let book = ask_book(vec![(52, dec!(1000))]);
        let result = calculate_buy_vwap(&book, dec!(500), &OrderbookConfig::default());
        let json = serde_json::to_string(&result).unwrap();

        assert!(json.contains("optimal_size_usd"));
        assert!(json.contains("slippage_cents"));
    }
}
