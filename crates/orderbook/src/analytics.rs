//! Pure book analytics: imbalance, liquidity, price impact, validation.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::book::{BookValidation, L2OrderBook, OrderBookLevel, Side};
use crate::vwap::{calculate_buy_vwap, calculate_sell_vwap, OrderbookConfig};

/// Usable size on one side within the depth window, sentinel-terminated.
fn side_liquidity(levels: &[OrderBookLevel], depth: usize) -> Decimal {
    levels
        .iter()
        .take(depth)
        .take_while(|level| !level.is_sentinel())
        .map(|level| level.size_usd)
        .sum()
}

/// Signed bid/ask liquidity imbalance within the first `depth` levels.
///
/// Ranges over [-1, 1]: positive means bid-heavy, negative ask-heavy,
/// zero when neither side has liquidity in the window.
#[must_use]
pub fn orderbook_imbalance(book: &L2OrderBook, depth: usize) -> Decimal {
    let bid_liquidity = side_liquidity(&book.bids, depth);
    let ask_liquidity = side_liquidity(&book.asks, depth);
    let total = bid_liquidity + ask_liquidity;

    if total == Decimal::ZERO {
        return Decimal::ZERO;
    }
    (bid_liquidity - ask_liquidity) / total
}

/// Total usable liquidity across both sides within the depth window.
#[must_use]
pub fn total_liquidity(book: &L2OrderBook, depth: usize) -> Decimal {
    side_liquidity(&book.bids, depth) + side_liquidity(&book.asks, depth)
}

/// Slippage a taker of `size_usd` would realize, in cents.
///
/// Delegates to the sizing walk and reports only its slippage; zero for
/// books with no usable depth.
#[must_use]
pub fn estimate_price_impact(
    book: &L2OrderBook,
    size_usd: Decimal,
    side: Side,
    config: &OrderbookConfig,
) -> Decimal {
    let result = match side {
        Side::Buy => calculate_buy_vwap(book, size_usd, config),
        Side::Sell => calculate_sell_vwap(book, size_usd, config),
    };
    result.slippage_cents
}

/// Data-quality check on a book snapshot.
///
/// A valid book is fresh (younger than `max_age` relative to `now`), has
/// at least `min_liquidity_usd` of depth within the configured window,
/// and quotes a non-zero best bid and ask. Failures are returned as
/// structured issues so callers can log and skip rather than abort.
#[must_use]
pub fn validate_book(
    book: &L2OrderBook,
    now: DateTime<Utc>,
    max_age: Duration,
    config: &OrderbookConfig,
) -> BookValidation {
    let mut issues = Vec::new();

    let age = book.age(now);
    let is_fresh = age <= max_age;
    if !is_fresh {
        issues.push(format!(
            "book is stale: age {}s exceeds max {}s",
            age.num_seconds(),
            max_age.num_seconds()
        ));
    }

    let liquidity = total_liquidity(book, config.max_depth);
    let has_liquidity = liquidity >= config.min_liquidity_usd;
    if !has_liquidity {
        issues.push(format!(
            "insufficient liquidity: ${liquidity} below ${} minimum",
            config.min_liquidity_usd
        ));
    }

    let has_valid_quotes = book.best_bid().is_some() && book.best_ask().is_some();
    if !has_valid_quotes {
        issues.push("missing or zero-priced best bid/ask".to_string());
    }

    if !issues.is_empty() {
        debug!(issue_count = issues.len(), "book failed validation");
    }

    BookValidation {
        is_fresh,
        has_liquidity,
        has_valid_quotes,
        issues,
    }
}

// =============================================================================
// Tests
// =============================================================================
