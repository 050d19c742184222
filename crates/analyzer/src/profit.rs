//! Fee-and-slippage-adjusted profit math.
//!
//! All components of cost are folded into `total_fees_usd`, so the
//! identity `net_profit_usd == gross_profit_usd - total_fees_usd` holds
//! exactly in `Decimal` for every input.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// =============================================================================
// Fee Schedule
// =============================================================================

/// Venue fees and fixed costs applied to a pair trade.
///
/// Rates are decimals of trade size (0.003 = 0.3%); gas is a fixed
/// per-trade USD cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Entry venue fee rate. Default: 0.3%
    pub entry_fee_rate: Decimal,

    /// Exit venue fee rate. Default: 0.3%
    pub exit_fee_rate: Decimal,

    /// Expected slippage cost as a rate of size. Default: 0.1%
    pub slippage_rate: Decimal,

    /// Fixed gas cost per trade, USD. Default: $0.50
    pub gas_cost_usd: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            entry_fee_rate: dec!(0.003),
            exit_fee_rate: dec!(0.003),
            slippage_rate: dec!(0.001),
            gas_cost_usd: dec!(0.50),
        }
    }
}

impl FeeSchedule {
    /// Builder method to set the entry fee rate.
    #[must_use]
    pub fn with_entry_fee_rate(mut self, rate: Decimal) -> Self {
        self.entry_fee_rate = rate;
        self.assert_valid();
        self
    }

    /// Builder method to set the exit fee rate.
    #[must_use]
    pub fn with_exit_fee_rate(mut self, rate: Decimal) -> Self {
        self.exit_fee_rate = rate;
        self.assert_valid();
        self
    }

    /// Builder method to set the slippage rate.
    #[must_use]
    pub fn with_slippage_rate(mut self, rate: Decimal) -> Self {
        self.slippage_rate = rate;
        self.assert_valid();
        self
    }

    /// Builder method to set the fixed gas cost.
    #[must_use]
    pub fn with_gas_cost_usd(mut self, gas: Decimal) -> Self {
        self.gas_cost_usd = gas;
        self.assert_valid();
        self
    }

    /// Variable costs as a single rate of trade size.
    #[must_use]
    pub fn variable_cost_rate(&self) -> Decimal {
        self.entry_fee_rate + self.exit_fee_rate + self.slippage_rate
    }

    fn assert_valid(&self) {
        for (name, rate) in [
            ("entry_fee_rate", self.entry_fee_rate),
            ("exit_fee_rate", self.exit_fee_rate),
            ("slippage_rate", self.slippage_rate),
        ] {
            assert!(
                rate >= Decimal::ZERO && rate < Decimal::ONE,
                "{name} {rate} outside [0, 1)"
            );
        }
        assert!(
            self.gas_cost_usd >= Decimal::ZERO,
            "negative gas cost {}",
            self.gas_cost_usd
        );
    }
}

// =============================================================================
// Profit Breakdown
// =============================================================================

/// Itemized economics of a trade at a given size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitBreakdown {
    /// Gross spread as a percentage of the entry price.
    pub gross_spread_pct: Decimal,

    /// Spread capture before costs, USD.
    pub gross_profit_usd: Decimal,

    /// Entry venue fee, USD.
    pub entry_fee_usd: Decimal,

    /// Exit venue fee, USD.
    pub exit_fee_usd: Decimal,

    /// Expected slippage cost, USD.
    pub slippage_cost_usd: Decimal,

    /// Fixed gas cost, USD.
    pub gas_cost_usd: Decimal,

    /// Every cost above, summed. `net = gross - total` exactly.
    pub total_fees_usd: Decimal,

    /// What remains after all costs, USD.
    pub net_profit_usd: Decimal,

    /// Net profit as a percentage of trade size.
    pub net_profit_pct: Decimal,
}

impl ProfitBreakdown {
    /// Returns true if the trade clears its costs.
    #[must_use]
    pub fn is_profitable(&self) -> bool {
        self.net_profit_usd > Decimal::ZERO
    }
}

/// Itemizes the economics of capturing `exit - entry` at `size_usd`.
///
/// # Panics
///
/// Panics on a non-positive entry price or negative size/exit price;
/// those are caller bugs, not market conditions.
#[must_use]
pub fn calculate_profit(
    entry_price_usd: Decimal,
    exit_price_usd: Decimal,
    size_usd: Decimal,
    fees: &FeeSchedule,
) -> ProfitBreakdown {
    assert!(
        entry_price_usd > Decimal::ZERO,
        "non-positive entry price {entry_price_usd}"
    );
    assert!(
        exit_price_usd >= Decimal::ZERO,
        "negative exit price {exit_price_usd}"
    );
    assert!(size_usd >= Decimal::ZERO, "negative size {size_usd}");

    let gross_spread_rate = (exit_price_usd - entry_price_usd) / entry_price_usd;
    let gross_profit_usd = size_usd * gross_spread_rate;

    let entry_fee_usd = size_usd * fees.entry_fee_rate;
    let exit_fee_usd = size_usd * fees.exit_fee_rate;
    let slippage_cost_usd = size_usd * fees.slippage_rate;
    let gas_cost_usd = fees.gas_cost_usd;
    let total_fees_usd = entry_fee_usd + exit_fee_usd + slippage_cost_usd + gas_cost_usd;

    let net_profit_usd = gross_profit_usd - total_fees_usd;
    let net_profit_pct = if size_usd > Decimal::ZERO {
        net_profit_usd / size_usd * dec!(100)
    } else {
        Decimal::ZERO
    };

    ProfitBreakdown {
        gross_spread_pct: gross_spread_rate * dec!(100),
        gross_profit_usd,
        entry_fee_usd,
        exit_fee_usd,
        slippage_cost_usd,
        gas_cost_usd,
        total_fees_usd,
        net_profit_usd,
        net_profit_pct,
    }
}

/// Spread (as a percentage of entry) at which a trade of `size_usd`
/// exactly covers its costs.
///
/// # Panics
///
/// Panics on a non-positive size.
#[must_use]
pub fn breakeven_spread_pct(size_usd: Decimal, fees: &FeeSchedule) -> Decimal {
    assert!(size_usd > Decimal::ZERO, "non-positive size {size_usd}");
    (size_usd * fees.variable_cost_rate() + fees.gas_cost_usd) / size_usd * dec!(100)
}

/// Smallest size at which the gross rate amortizes the fixed costs.
///
/// `None` means the variable cost rate meets or exceeds the gross rate:
/// there is no viable size at any level, and callers must surface that
/// explicitly rather than trade a clamped zero.
#[must_use]
pub fn min_profitable_size(gross_spread_rate: Decimal, fees: &FeeSchedule) -> Option<Decimal> {
    let margin_rate = gross_spread_rate - fees.variable_cost_rate();
    if margin_rate <= Decimal::ZERO {
        return None;
    }
    Some(fees.gas_cost_usd / margin_rate)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Fee Schedule Tests ====================

    #[test]
    fn test_schedule_default_values() {
        let fees = FeeSchedule::default();

        assert_eq!(fees.entry_fee_rate, dec!(0.003));
        assert_eq!(fees.exit_fee_rate, dec!(0.003));
        assert_eq!(fees.slippage_rate, dec!(0.001));
        assert_eq!(fees.gas_cost_usd, dec!(0.50));
        assert_eq!(fees.variable_cost_rate(), dec!(0.007));
    }

    #[test]
    fn test_schedule_builder_methods() {
        let fees = FeeSchedule::default()
            .with_entry_fee_rate(dec!(0.001))
            .with_exit_fee_rate(dec!(0.002))
            .with_slippage_rate(dec!(0.0005))
            .with_gas_cost_usd(dec!(0.70));

        assert_eq!(fees.variable_cost_rate(), dec!(0.0035));
        assert_eq!(fees.gas_cost_usd, dec!(0.70));
    }

    #[test]
    #[should_panic(expected = "entry_fee_rate")]
    fn test_schedule_rejects_rate_above_one() {
        let _ = FeeSchedule::default().with_entry_fee_rate(dec!(1.5));
    }

    // ==================== Profit Calculation Tests ====================

    #[test]
    fn test_worked_example() {
        // Entry 45c, exit 52c, $100, 0.3% + 0.3% fees, 0.1% slippage,
        // $0.70 gas.
        let fees = FeeSchedule::default().with_gas_cost_usd(dec!(0.70));
        let profit = calculate_profit(dec!(0.45), dec!(0.52), dec!(100), &fees);

        assert_eq!(profit.gross_spread_pct.round_dp(2), dec!(15.56));
        assert_eq!(profit.gross_profit_usd.round_dp(2), dec!(15.56));
        assert_eq!(profit.entry_fee_usd, dec!(0.30));
        assert_eq!(profit.exit_fee_usd, dec!(0.30));
        assert_eq!(profit.slippage_cost_usd, dec!(0.10));
        assert_eq!(profit.gas_cost_usd, dec!(0.70));
        assert_eq!(profit.total_fees_usd, dec!(1.40));
        assert_eq!(profit.net_profit_usd.round_dp(2), dec!(14.16));
        assert!(profit.is_profitable());
    }

    #[test]
    fn test_net_equals_gross_minus_total_exactly() {
        let fees = FeeSchedule::default();
        let cases = [
            (dec!(0.45), dec!(0.52), dec!(100)),
            (dec!(0.10), dec!(0.11), dec!(7.77)),
            (dec!(0.50), dec!(0.40), dec!(1000)),
            (dec!(0.99), dec!(0.01), dec!(3)),
        ];

        for (entry, exit, size) in cases {
            let profit = calculate_profit(entry, exit, size, &fees);
            assert_eq!(
                profit.net_profit_usd,
                profit.gross_profit_usd - profit.total_fees_usd
            );
        }
    }

    #[test]
    fn test_negative_spread_loses() {
        let fees = FeeSchedule::default();
        let profit = calculate_profit(dec!(0.52), dec!(0.45), dec!(100), &fees);

        assert!(profit.gross_profit_usd < Decimal::ZERO);
        assert!(!profit.is_profitable());
    }

    #[test]
    fn test_zero_size_costs_only_gas() {
        let fees = FeeSchedule::default();
        let profit = calculate_profit(dec!(0.45), dec!(0.52), dec!(0), &fees);

        assert_eq!(profit.gross_profit_usd, dec!(0));
        assert_eq!(profit.total_fees_usd, dec!(0.50));
        assert_eq!(profit.net_profit_usd, dec!(-0.50));
        assert_eq!(profit.net_profit_pct, dec!(0));
    }

    #[test]
    #[should_panic(expected = "non-positive entry price")]
    fn test_zero_entry_price_panics() {
        let _ = calculate_profit(dec!(0), dec!(0.52), dec!(100), &FeeSchedule::default());
    }

    // ==================== Breakeven Tests ====================

    #[test]
    fn test_breakeven_spread() {
        let fees = FeeSchedule::default();
        // 0.7% variable + $0.50 gas over $100 = 1.2%.
        assert_eq!(breakeven_spread_pct(dec!(100), &fees), dec!(1.2));
    }

    #[test]
    fn test_breakeven_shrinks_with_size() {
        let fees = FeeSchedule::default();
        assert!(breakeven_spread_pct(dec!(1000), &fees) < breakeven_spread_pct(dec!(100), &fees));
    }

    // ==================== Minimum Size Tests ====================

    #[test]
    fn test_min_profitable_size_amortizes_gas() {
        let fees = FeeSchedule::default();
        let min_size = min_profitable_size(dec!(0.02), &fees).unwrap();

        // Gas over (2% - 0.7%) margin.
        assert_eq!(min_size, dec!(0.50) / dec!(0.013));

        // At that size the gross margin covers gas to rounding.
        let net_at_min =
            min_size * dec!(0.02) - min_size * fees.variable_cost_rate() - fees.gas_cost_usd;
        assert!(net_at_min.abs() < dec!(0.0000001));
    }

    #[test]
    fn test_costs_dominate_means_no_viable_size() {
        let fees = FeeSchedule::default();

        assert_eq!(min_profitable_size(dec!(0.005), &fees), None);
        assert_eq!(min_profitable_size(dec!(0.007), &fees), None);
        assert_eq!(min_profitable_size(dec!(-0.01), &fees), None);
        assert!(min_profitable_size(dec!(0.0071), &fees).is_some());
    }
}
