//! Admin endpoints: force-settlement and market resolution.

use super::{ApiError, AppState, require_admin};
use crate::error::ExchangeError;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

/// Re-submit a recorded trade to the settlement bridge. The recovery
/// surface for trades whose original broadcast failed; refuses trades that
/// already carry a transaction id.
pub(super) async fn force_settle(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let trade = state
        .trades
        .get(&trade_id)
        .ok_or_else(|| ExchangeError::NotFound {
            resource: "trade",
            id: trade_id.clone(),
        })?;
    if let Some(existing) = &trade.tx_hash {
        return Err(ExchangeError::conflict(format!(
            "trade {trade_id} already settled in {existing}"
        ))
        .into());
    }
    let maker_order =
        state
            .store
            .get_order(&trade.maker_order_id)
            .ok_or_else(|| ExchangeError::NotFound {
                resource: "order",
                id: trade.maker_order_id.clone(),
            })?;
    let taker_order =
        state
            .store
            .get_order(&trade.taker_order_id)
            .ok_or_else(|| ExchangeError::NotFound {
                resource: "order",
                id: trade.taker_order_id.clone(),
            })?;

    let tx_hash = state
        .settlement
        .settle_trade(&trade, &maker_order, &taker_order, trade.size)
        .await?;
    state.trades.set_tx_hash(&trade_id, &tx_hash);
    info!(trade = %trade_id, tx = %tx_hash, "trade force-settled");
    Ok(Json(json!({ "success": true, "txHash": tx_hash })))
}

#[derive(Deserialize)]
pub(super) struct ResolveRequest {
    outcome: u8,
}

/// Resolve a market to an outcome, cancelling its resting orders.
pub(super) async fn resolve_market(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    if request.outcome > 1 {
        return Err(ExchangeError::invalid("outcome must be 0 or 1").into());
    }
    let cancelled = state.store.resolve_market(&id, request.outcome).await?;
    Ok(Json(json!({
        "success": true,
        "marketId": id,
        "outcome": request.outcome,
        "cancelledOrders": cancelled,
    })))
}
