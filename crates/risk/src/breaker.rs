//! Circuit breaker gating trade admission.
//!
//! The breaker is a three-state risk gate:
//!
//! - **Closed**: trading permitted.
//! - **Open**: a limit was breached less than one cooldown ago; all
//!   trades rejected.
//! - **CoolingDown**: the cooldown has elapsed since the last breach;
//!   trades are tentatively permitted again, and the first recorded
//!   result with no continuing breach returns the breaker to Closed.
//!
//! Validation is a pure read: calling [`CircuitBreaker::validate_trade`]
//! any number of times never changes state or metrics. Breach recording
//! and daily-metric accrual happen only through [`CircuitBreaker::record_open`]
//! and [`CircuitBreaker::record_close`], invoked after a trade actually
//! executes, so dry-run evaluation stays idempotent.
//!
//! # Example
//!
//! ```
//! use arb_engine_risk::{CircuitBreaker, CircuitBreakerConfig};
//! use rust_decimal_macros::dec;
//!
//! let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
//!
//! let validation = breaker.validate_trade("mkt-btc-100k", dec!(200), dec!(5));
//! assert!(validation.can_execute);
//!
//! // After execution, record the open and (later) the close.
//! breaker.record_open("mkt-btc-100k", dec!(200));
//! breaker.record_close("mkt-btc-100k", dec!(200), dec!(-3.50));
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Limit thresholds for the circuit breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Maximum realized daily loss before trading halts (USD).
    /// Default: $500
    pub max_daily_loss_usd: Decimal,

    /// Maximum acceptable loss for a single proposed trade (USD).
    /// Default: $50
    pub max_loss_per_trade_usd: Decimal,

    /// Maximum number of concurrently open positions.
    /// Default: 10
    pub max_concurrent_positions: u32,

    /// Maximum exposure to a single market (USD).
    /// Default: $50,000
    pub max_market_exposure_usd: Decimal,

    /// How long trading stays blocked after a breach.
    /// Default: 5 minutes
    #[serde(with = "duration_secs")]
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_daily_loss_usd: dec!(500),
            max_loss_per_trade_usd: dec!(50),
            max_concurrent_positions: 10,
            max_market_exposure_usd: dec!(50000),
            cooldown: Duration::from_secs(5 * 60), // 5 minutes
        }
    }
}

impl CircuitBreakerConfig {
    /// Tighter limits for unproven strategies.
    ///
    /// - Max daily loss: $100
    /// - Max per-trade loss: $10
    /// - Max concurrent positions: 3
    /// - Max market exposure: $5,000
    /// - Cooldown: 15 minutes
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            max_daily_loss_usd: dec!(100),
            max_loss_per_trade_usd: dec!(10),
            max_concurrent_positions: 3,
            max_market_exposure_usd: dec!(5000),
            cooldown: Duration::from_secs(15 * 60), // 15 minutes
        }
    }

    /// Micro limits for small-stakes live testing.
    ///
    /// - Max daily loss: $10
    /// - Max per-trade loss: $2
    /// - Max concurrent positions: 2
    /// - Max market exposure: $100
    /// - Cooldown: 2 minutes
    #[must_use]
    pub fn micro_testing() -> Self {
        Self {
            max_daily_loss_usd: dec!(10),
            max_loss_per_trade_usd: dec!(2),
            max_concurrent_positions: 2,
            max_market_exposure_usd: dec!(100),
            cooldown: Duration::from_secs(2 * 60), // 2 minutes
        }
    }

    /// Builder method to set the max daily loss.
    #[must_use]
    pub fn with_max_daily_loss_usd(mut self, loss: Decimal) -> Self {
        self.max_daily_loss_usd = loss;
        self
    }

    /// Builder method to set the per-trade loss cap.
    #[must_use]
    pub fn with_max_loss_per_trade_usd(mut self, loss: Decimal) -> Self {
        self.max_loss_per_trade_usd = loss;
        self
    }

    /// Builder method to set the concurrent position cap.
    #[must_use]
    pub fn with_max_concurrent_positions(mut self, positions: u32) -> Self {
        self.max_concurrent_positions = positions;
        self
    }

    /// Builder method to set the per-market exposure cap.
    #[must_use]
    pub fn with_max_market_exposure_usd(mut self, exposure: Decimal) -> Self {
        self.max_market_exposure_usd = exposure;
        self
    }

    /// Builder method to set the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Collects configuration problems without aborting.
    ///
    /// An empty result means the configuration is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.max_daily_loss_usd <= Decimal::ZERO {
            issues.push("max_daily_loss_usd must be positive".to_string());
        }
        if self.max_loss_per_trade_usd <= Decimal::ZERO {
            issues.push("max_loss_per_trade_usd must be positive".to_string());
        }
        if self.max_loss_per_trade_usd > self.max_daily_loss_usd {
            issues.push("max_loss_per_trade_usd exceeds max_daily_loss_usd".to_string());
        }
        if self.max_concurrent_positions == 0 {
            issues.push("max_concurrent_positions must be at least 1".to_string());
        }
        if self.max_market_exposure_usd <= Decimal::ZERO {
            issues.push("max_market_exposure_usd must be positive".to_string());
        }
        if self.cooldown.is_zero() {
            issues.push("cooldown must be non-zero".to_string());
        }
        issues
    }
}

// =============================================================================
// States, Metrics, Validation Results
// =============================================================================

/// Gate state, derived from stored facts at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Trading permitted.
    Closed,
    /// Breach within the last cooldown; trading blocked.
    Open,
    /// Cooldown elapsed; trading tentatively permitted.
    CoolingDown,
}

impl BreakerState {
    /// Returns the state as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::CoolingDown => "cooling_down",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rolling per-day counters, owned exclusively by the breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMetrics {
    /// UTC day the counters cover.
    pub day: NaiveDate,

    /// Trades opened today.
    pub trades_executed: u32,

    /// Cumulative realized P&L today (negative = loss).
    pub daily_pnl: Decimal,

    /// Limit breaches recorded today.
    pub breaches: u32,
}

impl DailyMetrics {
    fn new(day: NaiveDate) -> Self {
        Self {
            day,
            trades_executed: 0,
            daily_pnl: Decimal::ZERO,
            breaches: 0,
        }
    }

    /// Realized loss as a non-negative number.
    #[must_use]
    pub fn realized_loss(&self) -> Decimal {
        (-self.daily_pnl).max(Decimal::ZERO)
    }
}

/// Outcome of a trade admission check.
///
/// Rejection is a normal, frequent result, so it is data rather than an
/// error: `can_execute` plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeValidation {
    /// Whether the proposed trade may proceed.
    pub can_execute: bool,

    /// Why the trade was rejected, when it was.
    pub reason: Option<String>,
}

impl TradeValidation {
    /// An admission.
    #[must_use]
    pub fn allowed() -> Self {
        Self {
            can_execute: true,
            reason: None,
        }
    }

    /// A rejection with the given reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            can_execute: false,
            reason: Some(reason.into()),
        }
    }
}

/// Diagnostic snapshot of the breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerStatus {
    /// Current derived state.
    pub state: BreakerState,

    /// Today's counters.
    pub metrics: DailyMetrics,

    /// Concurrently open positions.
    pub open_positions: u32,

    /// Exposure summed across all markets (USD).
    pub total_exposure_usd: Decimal,

    /// Seconds of cooldown remaining while Open.
    pub cooldown_remaining_secs: Option<u64>,

    /// Whether an operator tripped the breaker by hand.
    pub manually_tripped: bool,
}

// =============================================================================
// Limit Breaches
// =============================================================================

/// The specific limit a proposed trade would breach.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LimitBreach {
    /// Breach within the last cooldown.
    #[error("circuit breaker open, {remaining_secs} seconds of cooldown remaining")]
    BreakerOpen {
        /// Seconds until the cooldown elapses.
        remaining_secs: u64,
    },

    /// Projected realized loss would reach the daily cap.
    #[error("daily loss limit: projected loss {projected_loss} >= {max_loss}")]
    DailyLoss {
        /// Realized loss plus the proposed trade's max loss.
        projected_loss: Decimal,
        /// Configured daily cap.
        max_loss: Decimal,
    },

    /// The proposed trade alone risks more than the per-trade cap.
    #[error("per-trade loss limit: {proposed_loss} > {max_loss}")]
    TradeLoss {
        /// The proposed trade's max loss.
        proposed_loss: Decimal,
        /// Configured per-trade cap.
        max_loss: Decimal,
    },

    /// Concurrent position cap reached.
    #[error("position limit: {open} open positions >= {max}")]
    Positions {
        /// Currently open positions.
        open: u32,
        /// Configured cap.
        max: u32,
    },

    /// Per-market exposure cap would be exceeded.
    #[error("exposure limit for {market_id}: {projected_exposure} > {max_exposure}")]
    Exposure {
        /// Market whose cap would be exceeded.
        market_id: String,
        /// Current exposure plus the proposed size.
        projected_exposure: Decimal,
        /// Configured cap.
        max_exposure: Decimal,
    },

    /// Operator halted trading by hand.
    #[error("circuit breaker manually tripped")]
    ManuallyTripped,
}

// =============================================================================
// Circuit Breaker
// =============================================================================

/// Facts the breaker stores; everything else is derived on read.
struct BreakerInner {
    metrics: DailyMetrics,
    exposure: HashMap<String, Decimal>,
    open_positions: u32,
    last_breach: Option<Instant>,
    manually_tripped: bool,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            metrics: DailyMetrics::new(Utc::now().date_naive()),
            exposure: HashMap::new(),
            open_positions: 0,
            last_breach: None,
            manually_tripped: false,
        }
    }

    /// Resets counters when the UTC day has rolled. Record path only.
    fn roll_day(&mut self) {
        let today = Utc::now().date_naive();
        if self.metrics.day != today {
            info!(day = %today, "daily metrics reset");
            self.metrics = DailyMetrics::new(today);
        }
    }

    /// Counters as of today, without mutating stored state.
    fn metrics_view(&self) -> DailyMetrics {
        let today = Utc::now().date_naive();
        if self.metrics.day == today {
            self.metrics.clone()
        } else {
            DailyMetrics::new(today)
        }
    }
}

/// Risk-limit gate with explicit, injectable state.
///
/// Constructed by the owning service and shared via `Arc`; all methods
/// take `&self`. Reads (`validate_trade`, `state`, `status`) never
/// mutate; writes are serialized by the internal lock.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: RwLock<BreakerInner>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &self.derive_state(&inner))
            .field("daily_pnl", &inner.metrics.daily_pnl)
            .field("open_positions", &inner.open_positions)
            .finish()
    }
}

impl CircuitBreaker {
    /// Creates a breaker with the given limits.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(BreakerInner::new()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn derive_state(&self, inner: &BreakerInner) -> BreakerState {
        if inner.manually_tripped {
            return BreakerState::Open;
        }
        match inner.last_breach {
            None => BreakerState::Closed,
            Some(breached_at) if breached_at.elapsed() < self.config.cooldown => BreakerState::Open,
            Some(_) => BreakerState::CoolingDown,
        }
    }

    /// Current derived state. Reading never transitions anything.
    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.derive_state(&self.inner.read())
    }

    /// Checks whether a proposed trade may proceed.
    ///
    /// Purely a function of current state, today's metrics, and the
    /// proposal: repeated evaluation is idempotent and mutates nothing.
    ///
    /// # Panics
    ///
    /// Panics on a negative proposed size or max loss (caller bug).
    #[must_use]
    pub fn validate_trade(
        &self,
        market_id: &str,
        proposed_size_usd: Decimal,
        max_loss_usd: Decimal,
    ) -> TradeValidation {
        assert!(
            proposed_size_usd >= Decimal::ZERO,
            "negative proposed size {proposed_size_usd}"
        );
        assert!(
            max_loss_usd >= Decimal::ZERO,
            "negative max loss {max_loss_usd}"
        );

        let inner = self.inner.read();
        match self.check_limits(&inner, market_id, proposed_size_usd, max_loss_usd) {
            Ok(()) => TradeValidation::allowed(),
            Err(breach) => {
                debug!(market_id, %breach, "trade rejected");
                TradeValidation::rejected(breach.to_string())
            }
        }
    }

    fn check_limits(
        &self,
        inner: &BreakerInner,
        market_id: &str,
        proposed_size_usd: Decimal,
        max_loss_usd: Decimal,
    ) -> Result<(), LimitBreach> {
        if inner.manually_tripped {
            return Err(LimitBreach::ManuallyTripped);
        }

        if let Some(breached_at) = inner.last_breach {
            let elapsed = breached_at.elapsed();
            if elapsed < self.config.cooldown {
                let remaining = self.config.cooldown - elapsed;
                return Err(LimitBreach::BreakerOpen {
                    remaining_secs: remaining.as_secs(),
                });
            }
            // Cooldown elapsed: tentatively permitted, remaining checks apply.
        }

        let metrics = inner.metrics_view();
        let projected_loss = metrics.realized_loss() + max_loss_usd;
        if projected_loss >= self.config.max_daily_loss_usd {
            return Err(LimitBreach::DailyLoss {
                projected_loss,
                max_loss: self.config.max_daily_loss_usd,
            });
        }

        if max_loss_usd > self.config.max_loss_per_trade_usd {
            return Err(LimitBreach::TradeLoss {
                proposed_loss: max_loss_usd,
                max_loss: self.config.max_loss_per_trade_usd,
            });
        }

        if inner.open_positions >= self.config.max_concurrent_positions {
            return Err(LimitBreach::Positions {
                open: inner.open_positions,
                max: self.config.max_concurrent_positions,
            });
        }

        let current_exposure = inner
            .exposure
            .get(market_id)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let projected_exposure = current_exposure + proposed_size_usd;
        if projected_exposure > self.config.max_market_exposure_usd {
            return Err(LimitBreach::Exposure {
                market_id: market_id.to_string(),
                projected_exposure,
                max_exposure: self.config.max_market_exposure_usd,
            });
        }

        Ok(())
    }

    /// Records that a position was opened.
    ///
    /// # Panics
    ///
    /// Panics on a negative size.
    pub fn record_open(&self, market_id: &str, size_usd: Decimal) {
        assert!(size_usd >= Decimal::ZERO, "negative size {size_usd}");

        let mut inner = self.inner.write();
        inner.roll_day();
        inner.open_positions += 1;
        inner.metrics.trades_executed += 1;
        *inner
            .exposure
            .entry(market_id.to_string())
            .or_insert(Decimal::ZERO) += size_usd;
        self.settle_breach_state(&mut inner);

        debug!(
            market_id,
            size = %size_usd,
            open_positions = inner.open_positions,
            "position opened"
        );
    }

    /// Records a closed trade and its realized P&L.
    ///
    /// This is the only path on which a daily-loss breach is recorded:
    /// a close that pushes realized loss to the cap opens the breaker
    /// synchronously.
    ///
    /// # Panics
    ///
    /// Panics on a negative size.
    pub fn record_close(&self, market_id: &str, size_usd: Decimal, realized_pnl: Decimal) {
        assert!(size_usd >= Decimal::ZERO, "negative size {size_usd}");

        let mut inner = self.inner.write();
        inner.roll_day();
        inner.open_positions = inner.open_positions.saturating_sub(1);
        inner.metrics.daily_pnl += realized_pnl;
        if let Some(exposure) = inner.exposure.get_mut(market_id) {
            *exposure = (*exposure - size_usd).max(Decimal::ZERO);
        }

        if inner.metrics.realized_loss() >= self.config.max_daily_loss_usd {
            inner.metrics.breaches += 1;
            inner.last_breach = Some(Instant::now());
            warn!(
                market_id,
                realized_loss = %inner.metrics.realized_loss(),
                max = %self.config.max_daily_loss_usd,
                "daily loss limit breached, breaker open"
            );
        } else {
            self.settle_breach_state(&mut inner);
        }

        debug!(
            market_id,
            pnl = %realized_pnl,
            daily_pnl = %inner.metrics.daily_pnl,
            "position closed"
        );
    }

    /// Clears a fully cooled-down breach once the underlying limit no
    /// longer binds, returning the breaker to Closed.
    fn settle_breach_state(&self, inner: &mut BreakerInner) {
        if let Some(breached_at) = inner.last_breach {
            let cooled = breached_at.elapsed() >= self.config.cooldown;
            let loss_ok = inner.metrics.realized_loss() < self.config.max_daily_loss_usd;
            if cooled && loss_ok {
                inner.last_breach = None;
                info!("cooldown elapsed with no continuing breach, breaker closed");
            }
        }
    }

    /// Halts trading until [`CircuitBreaker::reset`] is called.
    pub fn trip(&self, reason: &str) {
        let mut inner = self.inner.write();
        inner.manually_tripped = true;
        warn!(reason, "circuit breaker manually tripped");
    }

    /// Returns the breaker to a fresh Closed state.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        *inner = BreakerInner::new();
        info!("circuit breaker reset");
    }

    /// Today's counters (presented fresh after a day rollover).
    #[must_use]
    pub fn daily_metrics(&self) -> DailyMetrics {
        self.inner.read().metrics_view()
    }

    /// Diagnostic snapshot for logging and operator display.
    #[must_use]
    pub fn status(&self) -> BreakerStatus {
        let inner = self.inner.read();
        let state = self.derive_state(&inner);
        let cooldown_remaining_secs = inner.last_breach.and_then(|breached_at| {
            let elapsed = breached_at.elapsed();
            (elapsed < self.config.cooldown).then(|| (self.config.cooldown - elapsed).as_secs())
        });

        BreakerStatus {
            state,
            metrics: inner.metrics_view(),
            open_positions: inner.open_positions,
            total_exposure_usd: inner.exposure.values().copied().sum(),
            cooldown_remaining_secs,
            manually_tripped: inner.manually_tripped,
        }
    }
}

// =============================================================================
// Serde support for Duration
// =============================================================================

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// =============================================================================
// Tests
// =============================================================================
