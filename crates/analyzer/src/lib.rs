//! Cross-venue arbitrage analysis.
//!
//! Turns detected price discrepancies between prediction-market venues
//! into execution decisions. The pipeline takes an opportunity snapshot
//! plus L2 depth, sizes it through the order-book walk, prices fees and
//! gas, consults the shared circuit breaker, and emits a ranked,
//! fully-itemized analysis with an execution plan when the trade clears.
//!
//! Modules:
//! - [`matcher`]: pairs markets across venues by description keywords
//! - [`profit`]: fee-adjusted economics of a captured spread
//! - [`assessment`]: risk sub-scores and the confidence estimate
//! - [`pipeline`]: the end-to-end evaluation over the above
//!
//! The analyzer never mutates risk state: admissions are read-only
//! checks against the breaker, and only the execution path records
//! opens and closes.

pub mod assessment;
pub mod matcher;
pub mod pipeline;
pub mod profit;
pub mod types;

pub use assessment::{assess_risk, calculate_confidence, RiskAssessment, RiskLevel};
pub use matcher::{AssetMatch, AssetMatcher, MarketDescriptor, MatchConfig};
pub use pipeline::{AnalysisRequest, ArbitrageAnalyzer};
pub use profit::{
    breakeven_spread_pct, calculate_profit, min_profitable_size, FeeSchedule, ProfitBreakdown,
};
pub use types::{ArbitrageAnalysis, ArbitrageOpportunity, ExecutionPlan};
