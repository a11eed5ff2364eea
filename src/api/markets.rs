//! Market endpoints.

use super::{ApiError, AppState, require_admin};
use crate::crypto::{c32, derive_position_id};
use crate::error::ExchangeError;
use crate::pricing::{PRICE_SCALE, complement};
use crate::types::{Hex32, Market};
use crate::utils::current_time_millis;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

pub(super) async fn list(State(state): State<AppState>) -> Json<Value> {
    let mut markets = state.store.get_all_markets();
    markets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(json!({ "success": true, "markets": markets }))
}

pub(super) async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let market = state
        .store
        .get_market(&id)
        .ok_or(ExchangeError::NotFound {
            resource: "market",
            id,
        })?;
    Ok(Json(json!({ "success": true, "market": market })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateMarketRequest {
    question: String,
    creator: String,
    condition_id: String,
}

pub(super) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateMarketRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    if request.question.trim().is_empty() {
        return Err(ExchangeError::invalid("question must not be empty").into());
    }
    c32::decode_address(&request.creator)?;
    let condition_id = Hex32::from_hex(&request.condition_id)
        .ok_or_else(|| ExchangeError::invalid("conditionId must be 32 bytes of hex"))?;

    let market = Market {
        market_id: Uuid::new_v4().to_string(),
        condition_id,
        question: request.question,
        creator: request.creator,
        yes_position_id: derive_position_id(condition_id, 0),
        no_position_id: derive_position_id(condition_id, 1),
        yes_price: PRICE_SCALE / 2,
        no_price: PRICE_SCALE / 2,
        volume_24h: 0,
        created_at: current_time_millis(),
        resolved: false,
        outcome: None,
    };
    state.store.add_market(market.clone()).await?;
    Ok(Json(json!({ "success": true, "market": market })))
}

pub(super) async fn stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let market = state
        .store
        .get_market(&id)
        .ok_or(ExchangeError::NotFound {
            resource: "market",
            id: id.clone(),
        })?;
    let orders = state.store.get_market_orders(&id);
    let open_orders = orders.iter().filter(|o| o.status.is_resting()).count();
    let last_price = state.trades.last_trade(&id).map(|trade| {
        if trade.position_id == market.yes_position_id {
            trade.price
        } else {
            complement(trade.price)
        }
    });

    Ok(Json(json!({
        "success": true,
        "stats": {
            "orderCount": orders.len(),
            "openOrderCount": open_orders,
            "tradeCount": state.trades.market_trade_count(&id),
            "lastTradePrice": last_price,
            "yesPrice": market.yes_price,
            "noPrice": market.no_price,
            "volume24h": market.volume_24h,
        }
    })))
}

#[derive(Deserialize)]
pub(super) struct PriceHistoryQuery {
    interval: Option<String>,
    limit: Option<usize>,
}

fn interval_ms(name: &str) -> Result<u64, ExchangeError> {
    match name {
        "1m" => Ok(60_000),
        "5m" => Ok(300_000),
        "15m" => Ok(900_000),
        "1h" => Ok(3_600_000),
        "4h" => Ok(14_400_000),
        "1d" => Ok(86_400_000),
        other => Err(ExchangeError::invalid(format!(
            "unknown interval {other:?} (expected 1m, 5m, 15m, 1h, 4h, or 1d)"
        ))),
    }
}

pub(super) async fn price_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PriceHistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let market = state
        .store
        .get_market(&id)
        .ok_or(ExchangeError::NotFound {
            resource: "market",
            id,
        })?;
    let interval = interval_ms(query.interval.as_deref().unwrap_or("1h"))?;
    let limit = query.limit.unwrap_or(100).min(1_000);
    let buckets = state.trades.price_history(&market, interval, limit);
    Ok(Json(json!({ "success": true, "history": buckets })))
}
