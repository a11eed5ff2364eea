//! Aggregated orderbook views.

use serde::{Deserialize, Serialize};

/// One aggregated price level of a book side. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookLevel {
    /// Price in micro-sats.
    pub price: u64,
    /// Total resting size at this price.
    pub size: u64,
    /// Number of resting orders at this price.
    pub order_count: u64,
}

/// The aggregated book for one `(market, outcome-position)` pair.
///
/// Bids are sorted high to low, asks low to high. Only resting orders
/// (`OPEN` or `PARTIALLY_FILLED`) with remaining size contribute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookView {
    /// Demand levels, best (highest) first.
    pub bids: Vec<OrderbookLevel>,
    /// Supply levels, best (lowest) first.
    pub asks: Vec<OrderbookLevel>,
}

impl OrderbookView {
    /// Best bid price, if any depth exists.
    pub fn best_bid(&self) -> Option<u64> {
        self.bids.first().map(|level| level.price)
    }

    /// Best ask price, if any depth exists.
    pub fn best_ask(&self) -> Option<u64> {
        self.asks.first().map(|level| level.price)
    }
}
