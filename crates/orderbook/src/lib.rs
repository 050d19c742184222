//! L2 order-book model and VWAP sizing for binary-outcome markets.
//!
//! Prediction-market contracts trade in integer cents (1-99), so walking
//! the book to size an order is a matter of accumulating discounted level
//! depth until slippage against the best quote would exceed tolerance:
//!
//! ```text
//! Asks: 52c x $1000, 54c x $500, 60c x $2000
//!
//! Target $1200, liquidity factor 0.5, max slippage 2c:
//!   Level 1: $500 usable @ 52c   vwap 52.00  slippage 0.00  -> accept
//!   Level 2: $250 usable @ 54c   vwap 52.67  slippage 0.67  -> accept
//!   Level 3: would push vwap to 56.86, slippage 4.86        -> reject
//!
//!   Optimal size: $750 at vwap 52.67c
//! ```
//!
//! # Modules
//!
//! - [`book`]: Order-book levels, book snapshots, validation results
//! - [`vwap`]: Sizing configuration and the slippage-bounded walk
//! - [`analytics`]: Imbalance, liquidity, price impact, book validation
//!
//! All functions here are pure: they read the book and a caller-owned
//! [`OrderbookConfig`] and return a new result. Nothing is mutated and
//! nothing blocks, so sizing calls may run in parallel across markets.

pub mod analytics;
pub mod book;
pub mod vwap;

pub use analytics::{estimate_price_impact, orderbook_imbalance, total_liquidity, validate_book};
pub use book::{BookValidation, L2OrderBook, OrderBookLevel, Side};
pub use vwap::{
    calculate_arbitrage_vwap, calculate_buy_vwap, calculate_sell_vwap, ArbitrageVwap,
    OrderbookConfig, VwapResult,
};
