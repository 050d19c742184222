//! Risk assessment and confidence scoring.
//!
//! Both are computed fresh per evaluation and never stored: the risk
//! assessment buckets four bounded sub-scores into an overall level,
//! and the confidence score folds spread, liquidity, upstream risk,
//! and realized slippage into a single [0, 1] estimate.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// =============================================================================
// Risk Levels
// =============================================================================

/// Overall risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Weighted score at or below 3.
    Low,
    /// Weighted score at or below 5.
    Medium,
    /// Weighted score at or below 7.
    High,
    /// Weighted score above 7.
    Extreme,
}

impl RiskLevel {
    /// Returns the level as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Extreme => "extreme",
        }
    }

    fn from_score(score: Decimal) -> Self {
        if score <= dec!(3) {
            RiskLevel::Low
        } else if score <= dec!(5) {
            RiskLevel::Medium
        } else if score <= dec!(7) {
            RiskLevel::High
        } else {
            RiskLevel::Extreme
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Four bounded sub-scores and their weighted combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Bucketed overall level.
    pub overall: RiskLevel,

    /// Weighted combination of the sub-scores.
    pub overall_score: Decimal,

    /// 1-10: thin books score high.
    pub liquidity_risk: u8,

    /// 1-10: high expected slippage scores high.
    pub execution_risk: u8,

    /// 1-10: implausible spreads (stale data) and time pressure score high.
    pub timing_risk: u8,

    /// 1-10: realized walk slippage scores high.
    pub slippage_risk: u8,

    /// One entry per elevated sub-score.
    pub warnings: Vec<String>,
}

/// Scores an opportunity's risk from its observable inputs.
///
/// Sub-score thresholds: liquidity below $1k is high risk and below
/// $10k medium; execution and slippage key off the walk's combined
/// slippage; timing keys off implausibly large spreads (over 10%,
/// suggesting stale data) and the time-sensitivity flag.
#[must_use]
pub fn assess_risk(
    available_liquidity_usd: Decimal,
    spread_pct: Decimal,
    time_sensitive: bool,
    slippage_cents: Decimal,
) -> RiskAssessment {
    let liquidity_risk: u8 = if available_liquidity_usd < dec!(1000) {
        8
    } else if available_liquidity_usd < dec!(10000) {
        5
    } else {
        2
    };

    let execution_risk: u8 = if slippage_cents > dec!(2) { 7 } else { 3 };

    let timing_risk: u8 = if spread_pct > dec!(10) {
        8
    } else if time_sensitive {
        6
    } else {
        2
    };

    let slippage_risk: u8 = if slippage_cents > dec!(4) {
        8
    } else if slippage_cents > dec!(2) {
        5
    } else {
        2
    };

    let overall_score = dec!(0.3) * Decimal::from(liquidity_risk)
        + dec!(0.3) * Decimal::from(execution_risk)
        + dec!(0.2) * Decimal::from(timing_risk)
        + dec!(0.2) * Decimal::from(slippage_risk);

    let mut warnings = Vec::new();
    if liquidity_risk >= 7 {
        warnings.push(format!(
            "thin liquidity: ${available_liquidity_usd} available"
        ));
    }
    if execution_risk >= 7 {
        warnings.push(format!(
            "expected slippage {slippage_cents}c exceeds comfortable range"
        ));
    }
    if timing_risk >= 6 {
        if spread_pct > dec!(10) {
            warnings.push(format!(
                "spread {spread_pct}% is implausibly wide, quotes may be stale"
            ));
        } else {
            warnings.push("opportunity is time-sensitive".to_string());
        }
    }
    if slippage_risk >= 5 && execution_risk < 7 {
        warnings.push(format!("walk slippage {slippage_cents}c is elevated"));
    }

    RiskAssessment {
        overall: RiskLevel::from_score(overall_score),
        overall_score,
        liquidity_risk,
        execution_risk,
        timing_risk,
        slippage_risk,
        warnings,
    }
}

// =============================================================================
// Confidence Scoring
// =============================================================================

/// Folds spread, liquidity, upstream risk, and realized slippage into a
/// [0, 1] confidence estimate.
///
/// Starts from 0.5 and adds bounded adjustments: up to +0.3 for spread,
/// up to +0.2 for (log-scaled) liquidity, at most -0.3/+0.2 for the
/// upstream risk score, and at most -0.2 for slippage. The result is
/// clamped to [0, 1].
#[must_use]
pub fn calculate_confidence(
    spread_pct: Decimal,
    available_liquidity_usd: Decimal,
    risk_score: u8,
    slippage_cents: Decimal,
) -> f64 {
    let spread = spread_pct.to_f64().unwrap_or(0.0);
    let liquidity = available_liquidity_usd.to_f64().unwrap_or(0.0);
    let slippage_usd = slippage_cents.to_f64().unwrap_or(0.0) / 100.0;

    let spread_boost = (spread * 0.02).min(0.3);
    let liquidity_boost = (liquidity.max(1.0).log10() * 0.05).min(0.2);
    let risk_adjustment = ((5.0 - f64::from(risk_score)) * 0.05).max(-0.3);
    let slippage_adjustment = ((0.5 - slippage_usd) * 0.2).max(-0.2);

    (0.5 + spread_boost + liquidity_boost + risk_adjustment + slippage_adjustment).clamp(0.0, 1.0)
}

// =============================================================================
// Tests
// =============================================================================
