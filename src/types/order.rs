//! Signed order record and lifecycle states.

use super::ids::Hex32;
use super::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an order.
///
/// `Filled`, `Cancelled`, and `Expired` are absorbing: no further fills or
/// transitions are permitted once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted, nothing filled yet.
    Open,
    /// Some size filled, remainder resting.
    PartiallyFilled,
    /// Fully filled.
    Filled,
    /// Cancelled by the maker or by market resolution.
    Cancelled,
    /// Expired by the block-height monitor.
    Expired,
}

impl OrderStatus {
    /// Whether this state is absorbing.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    /// Whether an order in this state belongs in the sorted book.
    pub fn is_resting(self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Expired => "EXPIRED",
        };
        write!(f, "{s}")
    }
}

/// A resting or historical order.
///
/// Position semantics: `maker_position_id` is the token the maker surrenders,
/// `taker_position_id` the token the maker receives. For outcome `O`, a BUY
/// carries `(¬O, O)` and a SELL carries `(O, ¬O)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Opaque unique identifier, generated on acceptance.
    pub order_id: String,
    /// The principal that signed and owns the order.
    pub maker: String,
    /// The market this order trades in.
    pub market_id: String,
    /// The market's condition id.
    pub condition_id: Hex32,
    /// Token the maker surrenders.
    pub maker_position_id: Hex32,
    /// Token the maker receives.
    pub taker_position_id: Hex32,
    /// Buy or sell of the order's own outcome token.
    pub side: Side,
    /// Limit price in micro-sats, `0 < price < PRICE_SCALE`.
    pub price: u64,
    /// Total size in token units, at least 1.
    pub size: u64,
    /// Size filled so far. `filled_size + remaining_size == size` always.
    pub filled_size: u64,
    /// Size still resting.
    pub remaining_size: u64,
    /// Lifecycle state.
    pub status: OrderStatus,
    /// Numeric salt bound into the order hash.
    pub salt: String,
    /// Expiration block height; `0` means no expiration.
    pub expiration: u64,
    /// Acceptance time, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Last mutation time, milliseconds since the Unix epoch.
    pub updated_at: u64,
    /// RSV signature over the order hash, 130 hex chars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Compressed secp256k1 public key the signature verifies against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Process-local insertion sequence; deterministic tie-break for orders
    /// with identical price and timestamp. Not part of the wire shape.
    #[serde(skip)]
    pub seq: u64,
}

impl Order {
    /// The outcome token this order's book is keyed by: the token received
    /// for buys, the token surrendered for sells.
    pub fn book_position_id(&self) -> Hex32 {
        super::book_position_id(self.side, self.maker_position_id, self.taker_position_id)
    }
}
