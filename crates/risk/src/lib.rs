//! Risk state for the arbitrage decision core.
//!
//! Two pieces of shared mutable state sit between analysis and
//! execution:
//!
//! - [`CircuitBreaker`]: a risk-limit gate that admits or rejects
//!   proposed trades against rolling daily metrics and exposure caps,
//!   and blocks trading for a cooldown after a limit breach.
//! - [`PositionTracker`]: an append-only ledger of fills and
//!   settlements grouped into hedged pairs, from which realized and
//!   unrealized P&L are derived.
//!
//! Both are constructed explicitly and injected by the owning service —
//! there are no globals. All methods take `&self`; internal state lives
//! behind `parking_lot::RwLock`, so instances can be shared across
//! threads via `Arc`. Validation and queries are read-only and
//! repeatable; state changes only through the explicit `record_*`
//! operations.

pub mod breaker;
pub mod tracker;

pub use breaker::{
    BreakerState, BreakerStatus, CircuitBreaker, CircuitBreakerConfig, DailyMetrics, LimitBreach,
    TradeValidation,
};
pub use tracker::{
    FillRecord, Leg, PerformanceMetrics, PortfolioPnl, PositionPair, PositionState,
    PositionTracker, SettlementRecord, TrackerError,
};
