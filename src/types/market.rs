//! Binary-outcome market record.

use super::ids::Hex32;
use serde::{Deserialize, Serialize};

/// A binary prediction market with complementary YES and NO outcome tokens.
///
/// Created by an admin action, mutated by the matching engine (prices,
/// volume) and by resolution; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// Opaque market identifier.
    pub market_id: String,
    /// The on-chain condition this market is about.
    pub condition_id: Hex32,
    /// Human-readable market question.
    pub question: String,
    /// Principal that created the market.
    pub creator: String,
    /// Position id of the YES outcome token (outcome index 0).
    pub yes_position_id: Hex32,
    /// Position id of the NO outcome token (outcome index 1).
    pub no_position_id: Hex32,
    /// Current YES price in micro-sats. Always `PRICE_SCALE - no_price`.
    pub yes_price: u64,
    /// Current NO price in micro-sats. Always `PRICE_SCALE - yes_price`.
    pub no_price: u64,
    /// Accumulated traded notional in micro-sats.
    #[serde(rename = "volume24h")]
    pub volume_24h: u64,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Whether the market has been resolved.
    pub resolved: bool,
    /// The winning outcome index once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<u8>,
}

impl Market {
    /// The position id for the given outcome index, if it belongs to this
    /// market.
    pub fn position_for_index(&self, index: u8) -> Option<Hex32> {
        match index {
            0 => Some(self.yes_position_id),
            1 => Some(self.no_position_id),
            _ => None,
        }
    }

    /// Whether `position_id` is one of this market's two outcome tokens.
    pub fn has_position(&self, position_id: Hex32) -> bool {
        position_id == self.yes_position_id || position_id == self.no_position_id
    }

    /// The complementary outcome token of `position_id`, if it belongs to
    /// this market.
    pub fn opposite_position(&self, position_id: Hex32) -> Option<Hex32> {
        if position_id == self.yes_position_id {
            Some(self.no_position_id)
        } else if position_id == self.no_position_id {
            Some(self.yes_position_id)
        } else {
            None
        }
    }
}
