//! Matched-trade record.

use super::ids::Hex32;
use super::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a matched pair settles on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    /// Token swap between a buyer and a seller of the same outcome.
    Normal,
    /// Two buyers of complementary outcomes jointly fronting the collateral
    /// to mint a fresh YES/NO pair.
    Mint,
    /// Two sellers of complementary outcomes burning a YES/NO pair back to
    /// collateral.
    Merge,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeType::Normal => "NORMAL",
            TradeType::Mint => "MINT",
            TradeType::Merge => "MERGE",
        };
        write!(f, "{s}")
    }
}

/// A fill produced by the matching engine.
///
/// Immutable once created, except for `tx_hash` which the settlement bridge
/// records after a successful broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Opaque unique identifier.
    pub trade_id: String,
    /// The market the trade printed in.
    pub market_id: String,
    /// The market's condition id.
    pub condition_id: Hex32,
    /// The outcome token of the book this trade printed on; its price is
    /// quoted in this token's frame.
    pub position_id: Hex32,
    /// Token the maker surrendered.
    pub maker_position_id: Hex32,
    /// Token the maker received.
    pub taker_position_id: Hex32,
    /// The resting (price-setting) principal.
    pub maker: String,
    /// The incoming principal that crossed the spread.
    pub taker: String,
    /// Execution price in micro-sats, in the book's frame. Always the
    /// maker's price.
    pub price: u64,
    /// Filled size in token units.
    pub size: u64,
    /// The taker's side.
    pub side: Side,
    /// The maker order.
    pub maker_order_id: String,
    /// The taker order.
    pub taker_order_id: String,
    /// Settlement shape of this fill.
    pub trade_type: TradeType,
    /// Trade time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// On-chain transaction id once settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl Trade {
    /// Traded notional in micro-sats: `size * price / PRICE_SCALE` whole
    /// token units worth of collateral.
    pub fn notional(&self) -> u64 {
        let n = (self.size as u128).saturating_mul(self.price as u128)
            / crate::pricing::PRICE_SCALE as u128;
        n.min(u64::MAX as u128) as u64
    }
}
