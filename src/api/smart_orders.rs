//! Smart-order endpoints: preview, placement, and requirements.

use super::{ApiError, AppState};
use crate::crypto::{OrderHashFields, c32, order_hash, verify_rsv};
use crate::error::ExchangeError;
use crate::router::{PlanRequest, plan_execution};
use crate::store::NewOrder;
use crate::types::{Hex32, Market, Order, OrderKind, Side};
use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SmartOrderRequest {
    market_id: String,
    #[serde(default)]
    maker: Option<String>,
    outcome: u8,
    side: Side,
    order_type: OrderKind,
    size: u64,
    #[serde(default)]
    price: Option<u64>,
    /// Slippage budget as a percentage, e.g. `5` for 5%.
    #[serde(default)]
    max_slippage: Option<f64>,
    #[serde(default)]
    salt: Option<String>,
    #[serde(default)]
    expiration: Option<u64>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    public_key: Option<String>,
}

/// Percent to basis points, the single float-to-integer conversion of the
/// routing path.
fn slippage_budget_bps(percent: f64) -> Result<u64, ExchangeError> {
    if !percent.is_finite() || percent < 0.0 {
        return Err(ExchangeError::invalid("maxSlippage must be a non-negative number"));
    }
    Ok((percent * 100.0).round() as u64)
}

fn outcome_token(market: &Market, outcome: u8) -> Result<Hex32, ExchangeError> {
    market
        .position_for_index(outcome)
        .ok_or_else(|| ExchangeError::invalid(format!("outcome must be 0 or 1, got {outcome}")))
}

/// The maker/taker position pair for a side of an outcome: buys surrender
/// the complementary token and receive the outcome token, sells the
/// reverse.
fn position_pair(market: &Market, outcome_position: Hex32, side: Side) -> (Hex32, Hex32) {
    let opposite = if outcome_position == market.yes_position_id {
        market.no_position_id
    } else {
        market.yes_position_id
    };
    match side {
        Side::Buy => (opposite, outcome_position),
        Side::Sell => (outcome_position, opposite),
    }
}

fn build_plan(
    state: &AppState,
    request: &SmartOrderRequest,
) -> Result<crate::types::ExecutionPlan, ExchangeError> {
    let market = state
        .store
        .get_market(&request.market_id)
        .ok_or_else(|| ExchangeError::NotFound {
            resource: "market",
            id: request.market_id.clone(),
        })?;
    if request.size == 0 {
        return Err(ExchangeError::invalid("size must be at least 1"));
    }
    let position = outcome_token(&market, request.outcome)?;
    let book = state.store.get_orderbook(&request.market_id, position);
    let max_slippage_bps = request
        .max_slippage
        .map(slippage_budget_bps)
        .transpose()?;
    Ok(plan_execution(
        &book,
        &PlanRequest {
            order_type: request.order_type,
            side: request.side,
            size: request.size,
            limit_price: request.price,
            max_slippage_bps,
        },
    ))
}

pub(super) async fn preview(
    State(state): State<AppState>,
    Json(request): Json<SmartOrderRequest>,
) -> Result<Json<Value>, ApiError> {
    let plan = build_plan(&state, &request)?;
    Ok(Json(json!({ "success": true, "plan": plan })))
}

pub(super) async fn place(
    State(state): State<AppState>,
    Json(request): Json<SmartOrderRequest>,
) -> Result<Json<Value>, ApiError> {
    let market = state
        .store
        .get_market(&request.market_id)
        .ok_or_else(|| ExchangeError::NotFound {
            resource: "market",
            id: request.market_id.clone(),
        })?;
    let maker = request
        .maker
        .clone()
        .ok_or_else(|| ExchangeError::invalid("maker is required"))?;
    c32::decode_address(&maker)?;
    let position = outcome_token(&market, request.outcome)?;
    let (maker_position_id, taker_position_id) = position_pair(&market, position, request.side);

    match request.order_type {
        OrderKind::Limit => {
            let order = accept_limit(
                &state,
                &request,
                &maker,
                maker_position_id,
                taker_position_id,
            )
            .await?;
            Ok(Json(json!({ "success": true, "order": order })))
        }
        OrderKind::Market => {
            let plan = build_plan(&state, &request)?;
            if !plan.feasible {
                let plan = Box::new(plan);
                return Err(match plan.reason.as_deref() {
                    Some("slippage exceeds max") => ExchangeError::SlippageExceeded { plan },
                    _ => ExchangeError::InsufficientLiquidity { plan },
                }
                .into());
            }

            // One marketable limit per plan level; the engine fills them on
            // its next tick. Market takers carry no signature: their fills
            // settle as normal swaps where only the resting maker signs.
            let mut orders: Vec<Order> = Vec::with_capacity(plan.levels.len());
            for level in &plan.levels {
                let order = state
                    .store
                    .add_order(NewOrder {
                        maker: maker.clone(),
                        market_id: request.market_id.clone(),
                        side: request.side,
                        price: level.price,
                        size: level.size,
                        maker_position_id,
                        taker_position_id,
                        salt: Uuid::new_v4().as_u128().to_string(),
                        expiration: request.expiration.unwrap_or(0),
                        signature: None,
                        public_key: None,
                    })
                    .await?;
                orders.push(order);
            }
            Ok(Json(json!({ "success": true, "plan": plan, "orders": orders })))
        }
    }
}

async fn accept_limit(
    state: &AppState,
    request: &SmartOrderRequest,
    maker: &str,
    maker_position_id: Hex32,
    taker_position_id: Hex32,
) -> Result<Order, ExchangeError> {
    let price = request
        .price
        .ok_or_else(|| ExchangeError::invalid("price is required for LIMIT orders"))?;
    let salt = request
        .salt
        .clone()
        .ok_or_else(|| ExchangeError::invalid("salt is required for LIMIT orders"))?;
    let signature = request
        .signature
        .clone()
        .ok_or_else(|| ExchangeError::invalid("signature is required for LIMIT orders"))?;
    let public_key = request
        .public_key
        .clone()
        .ok_or_else(|| ExchangeError::invalid("publicKey is required for LIMIT orders"))?;
    let expiration = request.expiration.unwrap_or(0);

    let taker_amount = (price as u128)
        .checked_mul(request.size as u128)
        .ok_or_else(|| ExchangeError::invalid("order notional overflows"))?;
    let digest = order_hash(&OrderHashFields {
        maker,
        taker: maker,
        maker_position_id,
        taker_position_id,
        maker_amount: request.size as u128,
        taker_amount,
        salt: &salt,
        expiration,
    })?;
    verify_rsv(&digest, &signature, &public_key)?;

    state
        .store
        .add_order(NewOrder {
            maker: maker.to_string(),
            market_id: request.market_id.clone(),
            side: request.side,
            price,
            size: request.size,
            maker_position_id,
            taker_position_id,
            salt,
            expiration,
            signature: Some(signature),
            public_key: Some(public_key),
        })
        .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RequirementsRequest {
    maker: String,
    market_id: String,
    side: Side,
    outcome: u8,
    size: u64,
}

pub(super) async fn requirements(
    State(state): State<AppState>,
    Json(request): Json<RequirementsRequest>,
) -> Result<Json<Value>, ApiError> {
    let market = state
        .store
        .get_market(&request.market_id)
        .ok_or_else(|| ExchangeError::NotFound {
            resource: "market",
            id: request.market_id.clone(),
        })?;
    c32::decode_address(&request.maker)?;
    let position = outcome_token(&market, request.outcome)?;
    let (maker_position_id, taker_position_id) = position_pair(&market, position, request.side);

    Ok(Json(json!({
        "success": true,
        "requirements": {
            "maker": request.maker,
            "makerPositionId": maker_position_id,
            "takerPositionId": taker_position_id,
            "amount": request.size,
        }
    })))
}
