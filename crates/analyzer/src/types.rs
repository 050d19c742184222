//! Fixed-field value types exchanged with up- and downstream stages.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::assessment::RiskAssessment;
use crate::profit::ProfitBreakdown;

// =============================================================================
// Opportunity Snapshot
// =============================================================================

/// An opportunity as delivered by the upstream detection stage.
///
/// Immutable snapshot per evaluation: every field is explicit and typed,
/// validated at construction. Prices are in dollars per contract; the
/// pair is long YES on one venue and long NO on the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    /// Upstream opportunity id.
    pub id: String,

    /// Market quoting the YES leg.
    pub yes_market_id: String,

    /// Market quoting the NO leg.
    pub no_market_id: String,

    /// Human-readable event description (used for asset matching).
    pub description: String,

    /// YES contract price, dollars in (0, 1).
    pub yes_price_usd: Decimal,

    /// NO contract price, dollars in (0, 1).
    pub no_price_usd: Decimal,

    /// Detected spread as a percentage.
    pub spread_pct: Decimal,

    /// Liquidity the detector saw across both legs, USD.
    pub available_liquidity_usd: Decimal,

    /// Upstream risk score, 1 (benign) to 10 (hostile).
    pub risk_score: u8,

    /// Whether the opportunity decays quickly (e.g. nearing settlement).
    pub time_sensitive: bool,

    /// Estimated gas per leg, USD.
    pub estimated_gas_usd: Decimal,

    /// When the detector produced this snapshot.
    pub discovered_at: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    /// Creates a validated snapshot.
    ///
    /// # Panics
    ///
    /// Panics on prices outside (0, 1), a risk score outside 1-10, or
    /// negative liquidity/gas. A detector emitting such values is
    /// broken, not unlucky.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        yes_market_id: impl Into<String>,
        no_market_id: impl Into<String>,
        description: impl Into<String>,
        yes_price_usd: Decimal,
        no_price_usd: Decimal,
        spread_pct: Decimal,
        available_liquidity_usd: Decimal,
        risk_score: u8,
        time_sensitive: bool,
        estimated_gas_usd: Decimal,
    ) -> Self {
        assert!(
            yes_price_usd > Decimal::ZERO && yes_price_usd < Decimal::ONE,
            "yes price {yes_price_usd} outside (0, 1)"
        );
        assert!(
            no_price_usd > Decimal::ZERO && no_price_usd < Decimal::ONE,
            "no price {no_price_usd} outside (0, 1)"
        );
        assert!(
            (1..=10).contains(&risk_score),
            "risk score {risk_score} outside 1-10"
        );
        assert!(
            available_liquidity_usd >= Decimal::ZERO,
            "negative liquidity {available_liquidity_usd}"
        );
        assert!(
            estimated_gas_usd >= Decimal::ZERO,
            "negative gas estimate {estimated_gas_usd}"
        );

        Self {
            id: id.into(),
            yes_market_id: yes_market_id.into(),
            no_market_id: no_market_id.into(),
            description: description.into(),
            yes_price_usd,
            no_price_usd,
            spread_pct,
            available_liquidity_usd,
            risk_score,
            time_sensitive,
            estimated_gas_usd,
            discovered_at: Utc::now(),
        }
    }

    /// Entry price for spread math: the YES leg's cost.
    #[must_use]
    pub fn entry_price_usd(&self) -> Decimal {
        self.yes_price_usd
    }

    /// Implied exit for spread math: buying NO at `p` is selling YES at
    /// `1 - p`.
    #[must_use]
    pub fn implied_exit_price_usd(&self) -> Decimal {
        dec!(1) - self.no_price_usd
    }

    /// Combined cost of one hedged contract pair, dollars.
    #[must_use]
    pub fn pair_cost_usd(&self) -> Decimal {
        self.yes_price_usd + self.no_price_usd
    }
}

// =============================================================================
// Analysis Output
// =============================================================================

/// Concrete order sizes and economics for an executable pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Size to execute on the YES leg, USD.
    pub yes_leg_size_usd: Decimal,

    /// Size to execute on the NO leg, USD.
    pub no_leg_size_usd: Decimal,

    /// Cost of both legs at their walk VWAPs, USD.
    pub total_cost_usd: Decimal,

    /// Expected profit at settlement, USD.
    pub expected_profit_usd: Decimal,

    /// Gas for both legs (2x the per-leg estimate), USD.
    pub gas_estimate_usd: Decimal,
}

/// Complete evaluation of one opportunity.
///
/// A rejected opportunity is a normal outcome: `can_execute` is false
/// and `validation_errors` carries the reasons, but confidence, risk,
/// and the profit breakdown are still populated for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageAnalysis {
    /// The snapshot that was evaluated.
    pub opportunity: ArbitrageOpportunity,

    /// Whether the trade may proceed.
    pub can_execute: bool,

    /// Executable size from the sizing walk, USD.
    pub optimal_size_usd: Decimal,

    /// Combined slippage across both legs, cents.
    pub expected_slippage_cents: Decimal,

    /// YES leg walk VWAP, cents.
    pub vwap_yes_cents: Decimal,

    /// NO leg walk VWAP, cents.
    pub vwap_no_cents: Decimal,

    /// Confidence score in [0, 1].
    pub confidence: f64,

    /// Fee-adjusted economics at the optimal size.
    pub profit: ProfitBreakdown,

    /// Fresh risk assessment.
    pub risk: RiskAssessment,

    /// Present only when the trade is executable.
    pub execution_plan: Option<ExecutionPlan>,

    /// Business-infeasibility reasons, when rejected.
    pub validation_errors: Vec<String>,

    /// Degradations that did not block the evaluation.
    pub warnings: Vec<String>,

    /// When the evaluation ran.
    pub analyzed_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================
