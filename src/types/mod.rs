//! Domain records and enumerations for the exchange.
//!
//! All data is flat records and small enumerations: markets, orders, trades,
//! aggregated book levels, and execution plans. Enum wire names use the
//! exchange's JSON conventions (`BUY`/`SELL`, `OPEN`/`PARTIALLY_FILLED`/...).

mod book;
mod ids;
mod market;
mod order;
mod plan;
mod trade;

pub use book::{OrderbookLevel, OrderbookView};
pub use ids::Hex32;
pub use market::Market;
pub use order::{Order, OrderStatus};
pub use plan::{ExecutionPlan, PlanLevel};
pub use trade::{Trade, TradeType};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Bid for an outcome token.
    Buy,
    /// Offer of an outcome token.
    Sell,
}

impl Side {
    /// The opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Whether an incoming request is a resting limit order or an immediate
/// market execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Rests in the book at its limit price.
    Limit,
    /// Sweeps the book up to a slippage budget.
    Market,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Limit => write!(f, "LIMIT"),
            OrderKind::Market => write!(f, "MARKET"),
        }
    }
}

/// One of the two outcomes of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Outcome index 0.
    Yes,
    /// Outcome index 1.
    No,
}

impl Outcome {
    /// The on-chain outcome index used to derive position ids.
    pub fn index(self) -> u8 {
        match self {
            Outcome::Yes => 0,
            Outcome::No => 1,
        }
    }

    /// Parse an outcome index.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Outcome::Yes),
            1 => Some(Outcome::No),
            _ => None,
        }
    }

    /// The complementary outcome.
    pub fn opposite(self) -> Self {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Yes => write!(f, "YES"),
            Outcome::No => write!(f, "NO"),
        }
    }
}

/// The sorted-book key for an order: the outcome token the book entry is
/// about. Buys rest under the token they receive, sells under the token they
/// surrender.
pub fn book_position_id(side: Side, maker_position_id: Hex32, taker_position_id: Hex32) -> Hex32 {
    match side {
        Side::Buy => taker_position_id,
        Side::Sell => maker_position_id,
    }
}
