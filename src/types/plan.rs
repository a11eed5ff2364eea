//! Smart-router execution plans.

use super::OrderKind;
use serde::{Deserialize, Serialize};

/// One price level an execution plan consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLevel {
    /// Level price in micro-sats.
    pub price: u64,
    /// Size taken from this level.
    pub size: u64,
    /// Running total size including this level.
    pub cumulative_size: u64,
    /// Cost of this level in micro-sats (`size * price`).
    pub cost: u128,
}

/// The result of planning a market or immediately-marketable limit
/// execution against a book snapshot. A pure value; planning never writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    /// Whether this plans a market sweep or a limit order's marketable
    /// portion.
    pub order_type: OrderKind,
    /// The requested size.
    pub total_size: u64,
    /// Per-level fills in consumption order.
    pub levels: Vec<PlanLevel>,
    /// Size-weighted average price, rounded half-to-even. Zero when nothing
    /// fills.
    pub average_price: u64,
    /// Total cost across all levels in micro-sats.
    pub total_cost: u128,
    /// `|average - best| / best` in basis points, rounded half-to-even.
    pub slippage_bps: u64,
    /// The worst (last) level price consumed.
    pub worst_price: u64,
    /// The best (first) level price consumed.
    pub best_price: u64,
    /// Whether the request can execute within its constraints.
    pub feasible: bool,
    /// Why the plan is infeasible, when it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ExecutionPlan {
    /// The size the plan actually covers.
    pub fn filled_size(&self) -> u64 {
        self.levels.last().map(|l| l.cumulative_size).unwrap_or(0)
    }
}
