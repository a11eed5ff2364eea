//! Smart order routing: pure execution planning.
//!
//! The planner converts a requested size and slippage budget into the
//! per-level fills a market order would consume, or the portion of a limit
//! order that would immediately sweep. It only reads an aggregated book
//! snapshot and never writes; calling it twice with no interleaved writes
//! returns identical plans.

use crate::pricing::{div_round_half_even, slippage_bps};
use crate::types::{ExecutionPlan, OrderKind, OrderbookView, PlanLevel, Side};
use serde::Deserialize;

/// What to plan.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    /// Market sweep or marketable-limit probe.
    pub order_type: OrderKind,
    /// The requesting side; the plan consumes the opposite side of the book.
    pub side: Side,
    /// Requested size in token units.
    pub size: u64,
    /// Limit price for `Limit` plans.
    pub limit_price: Option<u64>,
    /// Slippage budget in basis points for `Market` plans.
    pub max_slippage_bps: Option<u64>,
}

/// Plan an execution against a book snapshot.
///
/// Buys consume asks from the cheapest level up, sells consume bids from the
/// richest level down. Limit plans stop at the limit price; market plans
/// stop when the size is covered or the book ends. The result is infeasible
/// when the book cannot cover the size, or when a market plan's slippage
/// exceeds the caller's budget.
pub fn plan_execution(book: &OrderbookView, request: &PlanRequest) -> ExecutionPlan {
    let candidates: &[_] = match request.side {
        Side::Buy => &book.asks,
        Side::Sell => &book.bids,
    };

    let mut levels: Vec<PlanLevel> = Vec::new();
    let mut remaining = request.size;
    let mut total_cost: u128 = 0;

    for level in candidates {
        if remaining == 0 {
            break;
        }
        if request.order_type == OrderKind::Limit {
            match (request.side, request.limit_price) {
                (Side::Buy, Some(limit)) if level.price > limit => break,
                (Side::Sell, Some(limit)) if level.price < limit => break,
                _ => {}
            }
        }
        let fill = remaining.min(level.size);
        let cost = (fill as u128) * (level.price as u128);
        total_cost += cost;
        remaining -= fill;
        levels.push(PlanLevel {
            price: level.price,
            size: fill,
            cumulative_size: request.size - remaining,
            cost,
        });
    }

    let filled = request.size - remaining;
    let best_price = levels.first().map(|l| l.price).unwrap_or(0);
    let worst_price = levels.last().map(|l| l.price).unwrap_or(0);
    let average_price = if filled > 0 {
        div_round_half_even(total_cost, filled as u128) as u64
    } else {
        0
    };
    let slippage = slippage_bps(average_price, best_price);

    let (feasible, reason) = if remaining > 0 {
        (false, Some("insufficient liquidity".to_string()))
    } else if request.order_type == OrderKind::Market
        && request
            .max_slippage_bps
            .is_some_and(|budget| slippage > budget)
    {
        (false, Some("slippage exceeds max".to_string()))
    } else {
        (true, None)
    };

    ExecutionPlan {
        order_type: request.order_type,
        total_size: request.size,
        levels,
        average_price,
        total_cost,
        slippage_bps: slippage,
        worst_price,
        best_price,
        feasible,
        reason,
    }
}
