//! Append-only position ledger for hedged pairs.
//!
//! A position pairs a long and a short leg on one market. The ledger
//! records facts only — fills and settlements are never edited after
//! creation — and every aggregate (cost basis, fees, realized and
//! unrealized P&L, performance statistics) is a fold over those facts.
//!
//! Lifecycle: `Opening` on the first fill, `Open` once both legs have at
//! least one fill, `Closing` while unwind orders are working, `Settled`
//! after the settlement record lands. Settled positions are immutable.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

// =============================================================================
// Ledger Records
// =============================================================================

/// Which leg of the hedge a fill belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    /// The long leg.
    Long,
    /// The opposing short leg.
    Short,
}

impl Leg {
    /// Returns the leg as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Long => "long",
            Leg::Short => "short",
        }
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One executed fill. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    /// Unique id of the fill.
    pub id: Uuid,

    /// Position this fill belongs to.
    pub position_id: Uuid,

    /// Market the position trades.
    pub market_id: String,

    /// Leg of the hedge.
    pub leg: Leg,

    /// Contracts filled.
    pub quantity: Decimal,

    /// Fill price in cents.
    pub price_cents: Decimal,

    /// Venue fee paid, USD.
    pub fee_usd: Decimal,

    /// Gas paid, USD.
    pub gas_usd: Decimal,

    /// When the fill occurred.
    pub filled_at: DateTime<Utc>,
}

impl FillRecord {
    /// A fill that opens a brand-new position.
    ///
    /// # Panics
    ///
    /// Panics on a non-positive quantity or negative costs.
    #[must_use]
    pub fn opening(
        market_id: &str,
        leg: Leg,
        quantity: Decimal,
        price_cents: Decimal,
        fee_usd: Decimal,
        gas_usd: Decimal,
    ) -> Self {
        Self::for_position(Uuid::new_v4(), market_id, leg, quantity, price_cents, fee_usd, gas_usd)
    }

    /// A fill on an existing position.
    ///
    /// # Panics
    ///
    /// Panics on a non-positive quantity or negative costs.
    #[must_use]
    pub fn for_position(
        position_id: Uuid,
        market_id: &str,
        leg: Leg,
        quantity: Decimal,
        price_cents: Decimal,
        fee_usd: Decimal,
        gas_usd: Decimal,
    ) -> Self {
        assert!(quantity > Decimal::ZERO, "non-positive fill quantity {quantity}");
        assert!(price_cents >= Decimal::ZERO, "negative fill price {price_cents}");
        assert!(fee_usd >= Decimal::ZERO, "negative fee {fee_usd}");
        assert!(gas_usd >= Decimal::ZERO, "negative gas {gas_usd}");

        Self {
            id: Uuid::new_v4(),
            position_id,
            market_id: market_id.to_string(),
            leg,
            quantity,
            price_cents,
            fee_usd,
            gas_usd,
            filled_at: Utc::now(),
        }
    }

    /// Cost of the contracts themselves, excluding fees and gas, USD.
    #[must_use]
    pub fn cost_usd(&self) -> Decimal {
        self.quantity * self.price_cents / dec!(100)
    }
}

/// Final settlement of a position. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// Unique id of the settlement.
    pub id: Uuid,

    /// Position being settled.
    pub position_id: Uuid,

    /// Settled contract price: 0 or 100 cents for a binary market.
    pub settled_price_cents: u32,

    /// Total proceeds paid out, USD.
    pub payout_usd: Decimal,

    /// When settlement occurred.
    pub settled_at: DateTime<Utc>,
}

impl SettlementRecord {
    /// Creates a settlement record.
    ///
    /// # Panics
    ///
    /// Panics if the settled price is not 0 or 100, or the payout is
    /// negative.
    #[must_use]
    pub fn new(position_id: Uuid, settled_price_cents: u32, payout_usd: Decimal) -> Self {
        assert!(
            settled_price_cents == 0 || settled_price_cents == 100,
            "binary settlement must be 0 or 100, got {settled_price_cents}"
        );
        assert!(payout_usd >= Decimal::ZERO, "negative payout {payout_usd}");

        Self {
            id: Uuid::new_v4(),
            position_id,
            settled_price_cents,
            payout_usd,
            settled_at: Utc::now(),
        }
    }
}

// =============================================================================
// Positions
// =============================================================================

/// Lifecycle state of a hedged pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    /// First leg filled, second still working.
    Opening,
    /// Both legs have fills.
    Open,
    /// Unwind orders working.
    Closing,
    /// Settlement recorded; immutable.
    Settled,
}

impl PositionState {
    /// Returns the state as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionState::Opening => "opening",
            PositionState::Open => "open",
            PositionState::Closing => "closing",
            PositionState::Settled => "settled",
        }
    }
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A hedged pair and its ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPair {
    /// Position id (shared by all of its fills).
    pub id: Uuid,

    /// Market the pair trades.
    pub market_id: String,

    /// Current lifecycle state.
    pub state: PositionState,

    /// Every fill, in arrival order.
    pub fills: Vec<FillRecord>,

    /// The settlement, once recorded.
    pub settlement: Option<SettlementRecord>,

    /// When the first fill arrived.
    pub opened_at: DateTime<Utc>,

    /// Realized P&L, set at settlement.
    pub realized_pnl: Option<Decimal>,
}

impl PositionPair {
    fn from_first_fill(fill: &FillRecord) -> Self {
        Self {
            id: fill.position_id,
            market_id: fill.market_id.clone(),
            state: PositionState::Opening,
            fills: Vec::new(),
            settlement: None,
            opened_at: fill.filled_at,
            realized_pnl: None,
        }
    }

    fn leg_quantity(&self, leg: Leg) -> Decimal {
        self.fills
            .iter()
            .filter(|fill| fill.leg == leg)
            .map(|fill| fill.quantity)
            .sum()
    }

    /// Contracts filled on the long leg.
    #[must_use]
    pub fn long_quantity(&self) -> Decimal {
        self.leg_quantity(Leg::Long)
    }

    /// Contracts filled on the short leg.
    #[must_use]
    pub fn short_quantity(&self) -> Decimal {
        self.leg_quantity(Leg::Short)
    }

    /// Contracts actually hedged: min of the two legs.
    #[must_use]
    pub fn matched_quantity(&self) -> Decimal {
        self.long_quantity().min(self.short_quantity())
    }

    /// Cost of all contracts, excluding fees and gas, USD.
    #[must_use]
    pub fn cost_basis_usd(&self) -> Decimal {
        self.fills.iter().map(FillRecord::cost_usd).sum()
    }

    /// All fees and gas paid across the ledger, USD.
    #[must_use]
    pub fn total_fees_usd(&self) -> Decimal {
        self.fills
            .iter()
            .map(|fill| fill.fee_usd + fill.gas_usd)
            .sum()
    }

    /// Mark for an unsettled pair: each fully hedged contract pays $1
    /// at settlement regardless of outcome, so the mark is that
    /// guaranteed payout minus cost and fees. `None` once settled.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Option<Decimal> {
        if self.state == PositionState::Settled {
            return None;
        }
        Some(self.matched_quantity() * dec!(1) - self.cost_basis_usd() - self.total_fees_usd())
    }
}

// =============================================================================
// Tracker Errors
// =============================================================================

/// Caller errors raised by the tracker.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// The position id is not in the ledger.
    #[error("unknown position {0}")]
    UnknownPosition(Uuid),

    /// The position has already settled and cannot change.
    #[error("position {0} already settled")]
    AlreadySettled(Uuid),
}

// =============================================================================
// Aggregates
// =============================================================================

/// Portfolio-wide P&L derived by folding over every ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPnl {
    /// Sum of realized P&L over settled pairs, USD.
    pub realized_usd: Decimal,

    /// Sum of marks over unsettled pairs, USD.
    pub unrealized_usd: Decimal,

    /// Cost basis across all pairs, USD.
    pub total_cost_usd: Decimal,

    /// Fees and gas across all pairs, USD.
    pub total_fees_usd: Decimal,

    /// Pairs not yet settled.
    pub open_positions: usize,

    /// Pairs settled.
    pub settled_positions: usize,
}

/// Win/loss statistics over settled pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// All pairs ever recorded.
    pub total_positions: usize,

    /// Pairs settled.
    pub settled_positions: usize,

    /// Settled pairs with positive realized P&L.
    pub wins: usize,

    /// Settled pairs with zero or negative realized P&L.
    pub losses: usize,

    /// wins / settled, 0 when nothing has settled.
    pub win_rate: f64,

    /// Sum of realized P&L, USD.
    pub total_realized_usd: Decimal,

    /// Mean realized P&L per settled pair, USD.
    pub average_realized_usd: Decimal,

    /// Fees and gas across all pairs, USD.
    pub total_fees_usd: Decimal,
}

// =============================================================================
// Position Tracker
// =============================================================================

/// Thread-safe ledger of hedged pairs.
///
/// Explicitly constructed and injected by the owning service. Recording
/// is serialized by the internal lock; aggregate queries fold over
/// snapshots and may run concurrently with recording on other positions.
#[derive(Debug, Default)]
pub struct PositionTracker {
    positions: RwLock<HashMap<Uuid, PositionPair>>,
}

impl PositionTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fill, creating the position on its first fill.
    ///
    /// Returns the position's state after the fill.
    ///
    /// # Errors
    ///
    /// [`TrackerError::AlreadySettled`] if the position has settled.
    pub fn record_fill(&self, fill: FillRecord) -> Result<PositionState, TrackerError> {
        let mut positions = self.positions.write();

        let pair = positions
            .entry(fill.position_id)
            .or_insert_with(|| {
                info!(
                    position_id = %fill.position_id,
                    market_id = %fill.market_id,
                    "position created"
                );
                PositionPair::from_first_fill(&fill)
            });

        if pair.state == PositionState::Settled {
            return Err(TrackerError::AlreadySettled(fill.position_id));
        }

        debug!(
            position_id = %fill.position_id,
            leg = %fill.leg,
            quantity = %fill.quantity,
            price = %fill.price_cents,
            "fill recorded"
        );
        pair.fills.push(fill);

        if pair.state == PositionState::Opening
            && pair.long_quantity() > Decimal::ZERO
            && pair.short_quantity() > Decimal::ZERO
        {
            pair.state = PositionState::Open;
        }
        Ok(pair.state)
    }

    /// Marks a position as unwinding.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownPosition`] if the id is not in the ledger,
    /// [`TrackerError::AlreadySettled`] if it has settled.
    pub fn begin_close(&self, position_id: Uuid) -> Result<(), TrackerError> {
        let mut positions = self.positions.write();
        let pair = positions
            .get_mut(&position_id)
            .ok_or(TrackerError::UnknownPosition(position_id))?;

        if pair.state == PositionState::Settled {
            return Err(TrackerError::AlreadySettled(position_id));
        }
        pair.state = PositionState::Closing;
        Ok(())
    }

    /// Appends the settlement and computes realized P&L.
    ///
    /// Realized P&L = payout − cost basis − fees and gas. The position
    /// becomes immutable afterwards.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownPosition`] if the id is not in the ledger,
    /// [`TrackerError::AlreadySettled`] on a duplicate settlement.
    pub fn record_settlement(
        &self,
        settlement: SettlementRecord,
    ) -> Result<Decimal, TrackerError> {
        let mut positions = self.positions.write();
        let pair = positions
            .get_mut(&settlement.position_id)
            .ok_or(TrackerError::UnknownPosition(settlement.position_id))?;

        if pair.state == PositionState::Settled {
            return Err(TrackerError::AlreadySettled(settlement.position_id));
        }

        let realized = settlement.payout_usd - pair.cost_basis_usd() - pair.total_fees_usd();
        info!(
            position_id = %settlement.position_id,
            settled_price = settlement.settled_price_cents,
            realized = %realized,
            "position settled"
        );

        pair.settlement = Some(settlement);
        pair.realized_pnl = Some(realized);
        pair.state = PositionState::Settled;
        Ok(realized)
    }

    /// Snapshot of one position.
    #[must_use]
    pub fn position(&self, position_id: Uuid) -> Option<PositionPair> {
        self.positions.read().get(&position_id).cloned()
    }

    /// Snapshot of every position.
    #[must_use]
    pub fn positions(&self) -> Vec<PositionPair> {
        self.positions.read().values().cloned().collect()
    }

    /// Portfolio-wide P&L, a pure fold over all ledgers.
    #[must_use]
    pub fn portfolio_pnl(&self) -> PortfolioPnl {
        let positions = self.positions.read();

        let mut pnl = PortfolioPnl {
            realized_usd: Decimal::ZERO,
            unrealized_usd: Decimal::ZERO,
            total_cost_usd: Decimal::ZERO,
            total_fees_usd: Decimal::ZERO,
            open_positions: 0,
            settled_positions: 0,
        };

        for pair in positions.values() {
            pnl.total_cost_usd += pair.cost_basis_usd();
            pnl.total_fees_usd += pair.total_fees_usd();
            match pair.unrealized_pnl() {
                Some(mark) => {
                    pnl.unrealized_usd += mark;
                    pnl.open_positions += 1;
                }
                None => {
                    pnl.realized_usd += pair.realized_pnl.unwrap_or(Decimal::ZERO);
                    pnl.settled_positions += 1;
                }
            }
        }
        pnl
    }

    /// Win/loss statistics over settled pairs.
    #[must_use]
    pub fn performance_metrics(&self) -> PerformanceMetrics {
        let positions = self.positions.read();

        let mut metrics = PerformanceMetrics {
            total_positions: positions.len(),
            settled_positions: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            total_realized_usd: Decimal::ZERO,
            average_realized_usd: Decimal::ZERO,
            total_fees_usd: Decimal::ZERO,
        };

        for pair in positions.values() {
            metrics.total_fees_usd += pair.total_fees_usd();
            if let Some(realized) = pair.realized_pnl {
                metrics.settled_positions += 1;
                metrics.total_realized_usd += realized;
                if realized > Decimal::ZERO {
                    metrics.wins += 1;
                } else {
                    metrics.losses += 1;
                }
            }
        }

        if metrics.settled_positions > 0 {
            metrics.win_rate = metrics.wins as f64 / metrics.settled_positions as f64;
            metrics.average_realized_usd =
                metrics.total_realized_usd / Decimal::from(metrics.settled_positions as u64);
        }
        metrics
    }
}

// =============================================================================
// Tests
// =============================================================================
