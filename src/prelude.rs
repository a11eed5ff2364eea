//! Convenience re-exports for the most commonly used exchange types.
//!
//! ```rust,ignore
//! use prediction_clob::prelude::*;
//! ```

pub use crate::engine::{MatchingEngine, TradeLog};
pub use crate::error::ExchangeError;
pub use crate::pricing::{PRICE_SCALE, complement};
pub use crate::router::{PlanRequest, plan_execution};
pub use crate::settlement::SettlementBridge;
pub use crate::store::{NewOrder, OrderStore};
pub use crate::types::{
    ExecutionPlan, Hex32, Market, Order, OrderKind, OrderStatus, OrderbookLevel, OrderbookView,
    Outcome, PlanLevel, Side, Trade, TradeType,
};
pub use crate::utils::current_time_millis;
