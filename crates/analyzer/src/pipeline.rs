//! The analysis pipeline: one opportunity in, one decision out.
//!
//! Stages run in a fixed order: depth-aware sizing (with a top-of-book
//! fallback when L2 data is missing), feasibility checks, a circuit
//! breaker consult, confidence scoring, risk assessment, and finally an
//! execution plan for opportunities that survive. Rejection at any
//! stage still produces a fully-populated analysis for reporting.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use arb_engine_orderbook::{calculate_arbitrage_vwap, L2OrderBook, OrderbookConfig};
use arb_engine_risk::CircuitBreaker;

use crate::assessment::{assess_risk, calculate_confidence};
use crate::profit::{calculate_profit, FeeSchedule};
use crate::types::{ArbitrageAnalysis, ArbitrageOpportunity, ExecutionPlan};

// =============================================================================
// Request
// =============================================================================

/// One opportunity plus whatever book data the caller has for it.
///
/// Books are optional: the pipeline degrades to top-of-book sizing when
/// either side's L2 feed is unavailable, and records the degradation as
/// a warning on the analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    /// The opportunity under evaluation.
    pub opportunity: ArbitrageOpportunity,

    /// L2 depth for the YES leg, when available.
    pub yes_book: Option<&'a L2OrderBook>,

    /// L2 depth for the NO leg, when available.
    pub no_book: Option<&'a L2OrderBook>,

    /// Capital the caller wants to deploy, USD.
    pub target_size_usd: Decimal,
}

// =============================================================================
// Analyzer
// =============================================================================

/// Stateless evaluation engine over a shared circuit breaker.
///
/// The analyzer itself holds only configuration; all mutable risk state
/// lives in the breaker, which is shared with the execution path via
/// `Arc` so admissions here and recordings there see the same limits.
#[derive(Debug, Clone)]
pub struct ArbitrageAnalyzer {
    orderbook_config: OrderbookConfig,
    fees: FeeSchedule,
    breaker: Arc<CircuitBreaker>,
}

impl ArbitrageAnalyzer {
    #[must_use]
    pub fn new(
        orderbook_config: OrderbookConfig,
        fees: FeeSchedule,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            orderbook_config,
            fees,
            breaker,
        }
    }

    #[must_use]
    pub fn orderbook_config(&self) -> &OrderbookConfig {
        &self.orderbook_config
    }

    #[must_use]
    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Evaluates a single opportunity end to end.
    ///
    /// Never returns an error: data-quality and feasibility problems
    /// surface as warnings and `validation_errors` on the result, and
    /// `can_execute` is true only when every stage passed.
    #[must_use]
    pub fn analyze(&self, request: &AnalysisRequest<'_>) -> ArbitrageAnalysis {
        let opportunity = &request.opportunity;
        let mut validation_errors = Vec::new();
        let mut warnings = Vec::new();

        // Stage 1: sizing. Depth-aware when both books are present,
        // top-of-book otherwise.
        let sizing = match (request.yes_book, request.no_book) {
            (Some(yes_book), Some(no_book)) => Some(calculate_arbitrage_vwap(
                yes_book,
                no_book,
                request.target_size_usd,
                &self.orderbook_config,
            )),
            _ => None,
        };

        let (optimal_size_usd, vwap_yes_cents, vwap_no_cents, slippage_cents) = match &sizing {
            Some(vwap) => (
                vwap.combined_optimal_size_usd,
                vwap.yes_leg.vwap_cents,
                vwap.no_leg.vwap_cents,
                vwap.total_slippage_cents,
            ),
            None => {
                warnings.push(
                    "L2 depth unavailable for one or both legs; sizing from top-of-book quotes"
                        .to_string(),
                );
                let capped = opportunity.available_liquidity_usd
                    * self.orderbook_config.liquidity_factor;
                (
                    request.target_size_usd.min(capped),
                    opportunity.yes_price_usd * dec!(100),
                    opportunity.no_price_usd * dec!(100),
                    Decimal::ZERO,
                )
            }
        };

        // Stage 2: feasibility.
        if optimal_size_usd <= Decimal::ZERO {
            validation_errors
                .push("no executable size within slippage tolerance".to_string());
        } else if let Some(vwap) = &sizing {
            if !vwap.can_execute {
                let allowance = Decimal::from(self.orderbook_config.max_slippage_cents) * dec!(2);
                if optimal_size_usd < self.orderbook_config.min_liquidity_usd {
                    validation_errors.push(format!(
                        "combined size ${optimal_size_usd} below ${} liquidity minimum",
                        self.orderbook_config.min_liquidity_usd
                    ));
                }
                if slippage_cents > allowance {
                    validation_errors.push(format!(
                        "combined slippage {slippage_cents}c exceeds {allowance}c allowance"
                    ));
                }
            }
        }

        // Stage 3: economics. Gas covers both legs.
        let pair_fees = self
            .fees
            .clone()
            .with_gas_cost_usd(opportunity.estimated_gas_usd * dec!(2));
        let profit = calculate_profit(
            opportunity.entry_price_usd(),
            opportunity.implied_exit_price_usd(),
            optimal_size_usd,
            &pair_fees,
        );

        // Stage 4: circuit breaker, with total costs as the worst case
        // this trade can lose today.
        if optimal_size_usd > Decimal::ZERO {
            let admission = self.breaker.validate_trade(
                &opportunity.yes_market_id,
                optimal_size_usd,
                profit.total_fees_usd,
            );
            if !admission.can_execute {
                validation_errors.push(
                    admission
                        .reason
                        .unwrap_or_else(|| "trading halted".to_string()),
                );
            }
        }

        // Stages 5 and 6: scoring, always populated.
        let confidence = calculate_confidence(
            opportunity.spread_pct,
            opportunity.available_liquidity_usd,
            opportunity.risk_score,
            slippage_cents,
        );
        let risk = assess_risk(
            opportunity.available_liquidity_usd,
            opportunity.spread_pct,
            opportunity.time_sensitive,
            slippage_cents,
        );

        let can_execute = validation_errors.is_empty() && optimal_size_usd > Decimal::ZERO;

        let execution_plan = can_execute.then(|| {
            let total_cost_usd = optimal_size_usd * vwap_yes_cents / dec!(100)
                + optimal_size_usd * vwap_no_cents / dec!(100);
            let expected_profit_usd = optimal_size_usd * (dec!(1) - vwap_yes_cents / dec!(100))
                + optimal_size_usd * (dec!(1) - vwap_no_cents / dec!(100));
            ExecutionPlan {
                yes_leg_size_usd: optimal_size_usd,
                no_leg_size_usd: optimal_size_usd,
                total_cost_usd,
                expected_profit_usd,
                gas_estimate_usd: opportunity.estimated_gas_usd * dec!(2),
            }
        });

        if can_execute {
            info!(
                opportunity_id = %opportunity.id,
                size = %optimal_size_usd,
                net_profit = %profit.net_profit_usd,
                confidence,
                "opportunity cleared for execution"
            );
        } else {
            debug!(
                opportunity_id = %opportunity.id,
                errors = validation_errors.len(),
                "opportunity rejected"
            );
        }

        ArbitrageAnalysis {
            opportunity: opportunity.clone(),
            can_execute,
            optimal_size_usd,
            expected_slippage_cents: slippage_cents,
            vwap_yes_cents,
            vwap_no_cents,
            confidence,
            profit,
            risk,
            execution_plan,
            validation_errors,
            warnings,
            analyzed_at: Utc::now(),
        }
    }

    /// Evaluates a batch and ranks the results for a human reviewer:
    /// highest confidence first, net profit breaking ties.
    #[must_use]
    pub fn analyze_batch(&self, requests: &[AnalysisRequest<'_>]) -> Vec<ArbitrageAnalysis> {
        let mut analyses: Vec<ArbitrageAnalysis> =
            requests.iter().map(|request| self.analyze(request)).collect();

        analyses.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.profit.net_profit_usd.cmp(&a.profit.net_profit_usd))
        });

        info!(
            total = analyses.len(),
            executable = analyses.iter().filter(|a| a.can_execute).count(),
            "batch analysis complete"
        );
        analyses
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use arb_engine_orderbook::OrderBookLevel;
    use arb_engine_risk::CircuitBreakerConfig;

    fn opportunity() -> ArbitrageOpportunity {
        ArbitrageOpportunity::new(
            "opp-1",
            "venue-a:btc-100k",
            "venue-b:btc-100k",
            "Will BTC close above $100k on Friday?",
            dec!(0.45),
            dec!(0.48),
            dec!(15.56),
            dec!(25000),
            3,
            false,
            dec!(0.35),
        )
    }

    fn deep_book(price_cents: u32) -> L2OrderBook {
        L2OrderBook::new(
            vec![OrderBookLevel::new(price_cents.saturating_sub(1), dec!(2000))],
            vec![OrderBookLevel::new(price_cents, dec!(2000))],
            Utc::now(),
        )
    }

    fn analyzer() -> ArbitrageAnalyzer {
        ArbitrageAnalyzer::new(
            OrderbookConfig::default(),
            FeeSchedule::default(),
            Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())),
        )
    }

    // ==================== Happy Path Tests ====================

    #[test]
    fn test_executable_pair_gets_a_plan() {
        let analyzer = analyzer();
        let yes_book = deep_book(45);
        let no_book = deep_book(48);
        let request = AnalysisRequest {
            opportunity: opportunity(),
            yes_book: Some(&yes_book),
            no_book: Some(&no_book),
            target_size_usd: dec!(500),
        };

        let analysis = analyzer.analyze(&request);

        assert!(analysis.can_execute, "{:?}", analysis.validation_errors);
        assert_eq!(analysis.optimal_size_usd, dec!(500));
        assert_eq!(analysis.vwap_yes_cents, dec!(45));
        assert_eq!(analysis.vwap_no_cents, dec!(48));
        assert_eq!(analysis.expected_slippage_cents, dec!(0));
        assert!(analysis.validation_errors.is_empty());

        let plan = analysis.execution_plan.expect("plan for executable pair");
        assert_eq!(plan.yes_leg_size_usd, dec!(500));
        assert_eq!(plan.no_leg_size_usd, dec!(500));
        // 500 * 0.45 + 500 * 0.48
        assert_eq!(plan.total_cost_usd, dec!(465));
        // 500 * 0.55 + 500 * 0.52
        assert_eq!(plan.expected_profit_usd, dec!(535));
        assert_eq!(plan.gas_estimate_usd, dec!(0.70));
    }

    #[test]
    fn test_profit_uses_both_legs_gas() {
        let analyzer = analyzer();
        let yes_book = deep_book(45);
        let no_book = deep_book(48);
        let request = AnalysisRequest {
            opportunity: opportunity(),
            yes_book: Some(&yes_book),
            no_book: Some(&no_book),
            target_size_usd: dec!(500),
        };

        let analysis = analyzer.analyze(&request);

        assert_eq!(analysis.profit.gas_cost_usd, dec!(0.70));
        // 0.7% of 500 variable + 0.70 gas.
        assert_eq!(analysis.profit.total_fees_usd, dec!(4.20));
        assert_eq!(
            analysis.profit.net_profit_usd,
            analysis.profit.gross_profit_usd - analysis.profit.total_fees_usd
        );
    }

    // ==================== Rejection Tests ====================

    #[test]
    fn test_empty_books_reject_with_zero_size() {
        let analyzer = analyzer();
        let empty = L2OrderBook::new(vec![], vec![], Utc::now());
        let no_book = deep_book(48);
        let request = AnalysisRequest {
            opportunity: opportunity(),
            yes_book: Some(&empty),
            no_book: Some(&no_book),
            target_size_usd: dec!(500),
        };

        let analysis = analyzer.analyze(&request);

        assert!(!analysis.can_execute);
        assert_eq!(analysis.optimal_size_usd, dec!(0));
        assert!(analysis.execution_plan.is_none());
        assert!(analysis
            .validation_errors
            .iter()
            .any(|error| error.contains("no executable size")));
    }

    #[test]
    fn test_thin_pair_rejects_below_liquidity_minimum() {
        let analyzer = analyzer();
        // $40 per side, factor 0.5 -> $20 combined, under the $50 floor.
        let yes_book = L2OrderBook::new(
            vec![],
            vec![OrderBookLevel::new(45, dec!(40))],
            Utc::now(),
        );
        let no_book = L2OrderBook::new(
            vec![],
            vec![OrderBookLevel::new(48, dec!(40))],
            Utc::now(),
        );
        let request = AnalysisRequest {
            opportunity: opportunity(),
            yes_book: Some(&yes_book),
            no_book: Some(&no_book),
            target_size_usd: dec!(500),
        };

        let analysis = analyzer.analyze(&request);

        assert!(!analysis.can_execute);
        assert!(analysis
            .validation_errors
            .iter()
            .any(|error| error.contains("liquidity minimum")));
    }

    #[test]
    fn test_tripped_breaker_blocks_execution() {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()));
        breaker.trip("manual halt for venue incident");
        let analyzer = ArbitrageAnalyzer::new(
            OrderbookConfig::default(),
            FeeSchedule::default(),
            breaker,
        );
        let yes_book = deep_book(45);
        let no_book = deep_book(48);
        let request = AnalysisRequest {
            opportunity: opportunity(),
            yes_book: Some(&yes_book),
            no_book: Some(&no_book),
            target_size_usd: dec!(500),
        };

        let analysis = analyzer.analyze(&request);

        assert!(!analysis.can_execute);
        assert!(analysis.execution_plan.is_none());
        assert!(!analysis.validation_errors.is_empty());
        // Scoring still runs for rejected opportunities.
        assert!(analysis.confidence > 0.0);
    }

    // ==================== Fallback Tests ====================

    #[test]
    fn test_missing_book_falls_back_to_top_of_book() {
        let analyzer = analyzer();
        let no_book = deep_book(48);
        let request = AnalysisRequest {
            opportunity: opportunity(),
            yes_book: None,
            no_book: Some(&no_book),
            target_size_usd: dec!(500),
        };

        let analysis = analyzer.analyze(&request);

        assert!(analysis
            .warnings
            .iter()
            .any(|warning| warning.contains("top-of-book")));
        // min(500, 25000 * 0.5)
        assert_eq!(analysis.optimal_size_usd, dec!(500));
        assert_eq!(analysis.vwap_yes_cents, dec!(45));
        assert_eq!(analysis.vwap_no_cents, dec!(48));
        assert_eq!(analysis.expected_slippage_cents, dec!(0));
        assert!(analysis.can_execute);
    }

    #[test]
    fn test_fallback_caps_at_discounted_liquidity() {
        let analyzer = analyzer();
        let mut opp = opportunity();
        opp.available_liquidity_usd = dec!(600);
        let request = AnalysisRequest {
            opportunity: opp,
            yes_book: None,
            no_book: None,
            target_size_usd: dec!(500),
        };

        let analysis = analyzer.analyze(&request);

        // min(500, 600 * 0.5)
        assert_eq!(analysis.optimal_size_usd, dec!(300));
    }

    // ==================== Batch Tests ====================

    #[test]
    fn test_batch_ranks_by_confidence() {
        let analyzer = analyzer();
        let yes_book = deep_book(45);
        let no_book = deep_book(48);

        let mut weak = opportunity();
        weak.id = "opp-weak".to_string();
        weak.spread_pct = dec!(1);
        weak.risk_score = 9;

        let requests = vec![
            AnalysisRequest {
                opportunity: weak,
                yes_book: Some(&yes_book),
                no_book: Some(&no_book),
                target_size_usd: dec!(500),
            },
            AnalysisRequest {
                opportunity: opportunity(),
                yes_book: Some(&yes_book),
                no_book: Some(&no_book),
                target_size_usd: dec!(500),
            },
        ];

        let analyses = analyzer.analyze_batch(&requests);

        assert_eq!(analyses.len(), 2);
        assert_eq!(analyses[0].opportunity.id, "opp-1");
        assert_eq!(analyses[1].opportunity.id, "opp-weak");
        assert!(analyses[0].confidence >= analyses[1].confidence);
    }
}
