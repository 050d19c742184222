//! Order-book data model for binary-outcome markets.
//!
//! Books are immutable snapshots supplied by the market-data layer: bids
//! pre-sorted descending, asks ascending. A level with zero price or zero
//! size is a sentinel marking the end of usable depth on that side.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Sides and Levels
// =============================================================================

/// Which side of the book an order takes liquidity from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Taking from the asks.
    Buy,
    /// Taking from the bids.
    Sell,
}

impl Side {
    /// Returns the side as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single price level: price in integer cents, displayed size in USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    /// Price in cents (0-99 for a binary contract).
    pub price_cents: u32,

    /// Displayed size at this price, in USD.
    pub size_usd: Decimal,
}

impl OrderBookLevel {
    /// Creates a level.
    ///
    /// # Panics
    ///
    /// Panics if the price is outside the valid tick range (0-99) or the
    /// size is negative. Feeds delivering such values are a caller bug.
    #[must_use]
    pub fn new(price_cents: u32, size_usd: Decimal) -> Self {
        assert!(price_cents < 100, "price {price_cents} outside tick range");
        assert!(size_usd >= Decimal::ZERO, "negative level size {size_usd}");
        Self {
            price_cents,
            size_usd,
        }
    }

    /// Returns true if this level terminates book-walking.
    ///
    /// Zero price or zero size means "no more liquidity" on this side.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.price_cents == 0 || self.size_usd <= Decimal::ZERO
    }
}

// =============================================================================
// L2 Order Book
// =============================================================================

/// An L2 order-book snapshot with freshness metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L2OrderBook {
    /// Bid levels, descending by price.
    pub bids: Vec<OrderBookLevel>,

    /// Ask levels, ascending by price.
    pub asks: Vec<OrderBookLevel>,

    /// When the snapshot was taken by the feed.
    pub last_update: DateTime<Utc>,
}

impl L2OrderBook {
    /// Creates a book snapshot. Levels must already be sorted by the feed.
    #[must_use]
    pub fn new(
        bids: Vec<OrderBookLevel>,
        asks: Vec<OrderBookLevel>,
        last_update: DateTime<Utc>,
    ) -> Self {
        Self {
            bids,
            asks,
            last_update,
        }
    }

    /// Best bid price in cents, if the bid side has usable depth.
    #[must_use]
    pub fn best_bid(&self) -> Option<u32> {
        self.bids
            .first()
            .filter(|level| !level.is_sentinel())
            .map(|level| level.price_cents)
    }

    /// Best ask price in cents, if the ask side has usable depth.
    #[must_use]
    pub fn best_ask(&self) -> Option<u32> {
        self.asks
            .first()
            .filter(|level| !level.is_sentinel())
            .map(|level| level.price_cents)
    }

    /// Top-of-book spread in cents. Negative for a crossed book.
    #[must_use]
    pub fn spread_cents(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(i64::from(ask) - i64::from(bid)),
            _ => None,
        }
    }

    /// Age of the snapshot relative to `now`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_update
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Outcome of a data-quality check on a book snapshot.
///
/// Data-quality failures are reported as issues, never as panics: a stale
/// or empty book is a market condition the caller logs and skips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookValidation {
    /// Snapshot age is below the caller-supplied maximum.
    pub is_fresh: bool,

    /// Liquidity within the configured depth window meets the minimum.
    pub has_liquidity: bool,

    /// Both sides have a non-zero best quote.
    pub has_valid_quotes: bool,

    /// Human-readable descriptions of every failed check.
    pub issues: Vec<String>,
}

impl BookValidation {
    /// Returns true if every check passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_fresh && self.has_liquidity && self.has_valid_quotes
    }
}

// =============================================================================
// Tests
// =============================================================================
