//! # Prediction-Market Central Limit Order Book
//!
//! The off-chain core of a hybrid prediction-market exchange. Traders submit
//! cryptographically signed orders for binary (YES/NO) outcome tokens; the
//! exchange keeps per-market order books, matches crossing orders continuously
//! with price-time priority, and hands matched trades to a settlement bridge
//! that performs the atomic token swap on the Stacks chain.
//!
//! ## Architecture
//!
//! - **Hot order store** ([`store::OrderStore`]): concurrent maps for orders,
//!   markets, and secondary indices, with price-sorted bid/ask views per
//!   `(market, outcome-position)` book and a durable SQL mirror kept in
//!   lock-step with every state change.
//! - **Matching engine** ([`engine::MatchingEngine`]): a single periodic
//!   driver (100 ms) that walks each book's demand and supply queues with two
//!   pointers, creates trade records, debits both orders under per-order
//!   locks, and invokes settlement best-effort.
//! - **Smart router** ([`router`]): a pure planner that converts a requested
//!   size and slippage budget into a feasible multi-level execution plan
//!   without touching the book.
//! - **Settlement bridge** ([`settlement::SettlementBridge`]): converts a
//!   matched trade into a contract call (normal swap, mint of a YES/NO pair,
//!   or merge back to collateral), signs it with the operator key, and
//!   broadcasts it.
//! - **Block-height monitor** ([`monitor::BlockHeightMonitor`]): polls the
//!   chain tip and expires resting orders whose expiration height has passed.
//!
//! All prices are integers in micro-sats with [`pricing::PRICE_SCALE`] =
//! 1,000,000 per whole token; YES and NO prices are complementary. The
//! matching path is integer-only; the mid-price and slippage ratios are the
//! only rounding sites and round half-to-even.

pub mod api;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod prelude;
pub mod pricing;
pub mod router;
pub mod settlement;
pub mod store;
pub mod types;
mod utils;

pub use engine::{MatchingEngine, TradeLog};
pub use error::ExchangeError;
pub use monitor::BlockHeightMonitor;
pub use router::plan_execution;
pub use settlement::SettlementBridge;
pub use store::OrderStore;
pub use types::{
    ExecutionPlan, Market, Order, OrderKind, OrderStatus, OrderbookLevel, OrderbookView, Outcome,
    Side, Trade, TradeType,
};
pub use utils::current_time_millis;
