//! Orderbook, trade-tape, and price endpoints.

use super::{ApiError, AppState};
use crate::error::ExchangeError;
use crate::pricing::complement;
use crate::types::Hex32;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BookQuery {
    position_id: Option<String>,
}

pub(super) async fn get_books(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<BookQuery>,
) -> Result<Json<Value>, ApiError> {
    let market = state
        .store
        .get_market(&id)
        .ok_or(ExchangeError::NotFound {
            resource: "market",
            id: id.clone(),
        })?;

    if let Some(raw) = query.position_id {
        let position_id = Hex32::from_hex(&raw)
            .ok_or_else(|| ExchangeError::invalid("positionId must be 32 bytes of hex"))?;
        if !market.has_position(position_id) {
            return Err(ExchangeError::invalid("positionId does not belong to the market").into());
        }
        let book = state.store.get_orderbook(&id, position_id);
        return Ok(Json(json!({ "success": true, "orderbook": book })));
    }

    let yes = state.store.get_orderbook(&id, market.yes_position_id);
    let no = state.store.get_orderbook(&id, market.no_position_id);
    Ok(Json(json!({ "success": true, "yes": yes, "no": no })))
}

#[derive(Deserialize)]
pub(super) struct TradesQuery {
    limit: Option<usize>,
}

pub(super) async fn recent_trades(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TradesQuery>,
) -> Result<Json<Value>, ApiError> {
    if state.store.get_market(&id).is_none() {
        return Err(ExchangeError::NotFound {
            resource: "market",
            id,
        }
        .into());
    }
    let limit = query.limit.unwrap_or(50).min(500);
    let trades = state.trades.recent(&id, limit);
    Ok(Json(json!({ "success": true, "trades": trades })))
}

pub(super) async fn price(
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
    let yes_book = state.store.get_orderbook(&id, market.yes_position_id);
    let last = state.trades.last_trade(&id).map(|trade| {
        if trade.position_id == market.yes_position_id {
            trade.price
        } else {
            complement(trade.price)
        }
    });

    Ok(Json(json!({
        "success": true,
        "yesPrice": market.yes_price,
        "noPrice": market.no_price,
        "bestBid": yes_book.best_bid(),
        "bestAsk": yes_book.best_ask(),
        "lastTradePrice": last,
    })))
}
