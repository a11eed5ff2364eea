//! Order lookup and cancellation endpoints.

use super::{ApiError, AppState};
use crate::error::ExchangeError;
use axum::extract::{Path, State};
use axum::response::Json;
use serde_json::{Value, json};
use std::time::Duration;

/// How many times a cancel retries a contended order lock before giving up.
const CANCEL_ATTEMPTS: usize = 4;

/// Pause between cancel retries; the engine holds an order lock for at most
/// one fill write.
const CANCEL_RETRY_DELAY: Duration = Duration::from_millis(25);

pub(super) async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order = state.store.get_order(&id).ok_or(ExchangeError::NotFound {
        resource: "order",
        id,
    })?;
    Ok(Json(json!({ "success": true, "order": order })))
}

pub(super) async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    // `Ok(false)` from the store is either a terminal order or a contended
    // lock. Contention is a retry signal, so retry it here; only a still
    // resting order after all attempts surfaces as an error.
    for attempt in 0..CANCEL_ATTEMPTS {
        if state.store.cancel_order(&id).await? {
            let order = state.store.get_order(&id);
            return Ok(Json(json!({ "success": true, "order": order })));
        }
        let order = state
            .store
            .get_order(&id)
            .ok_or_else(|| ExchangeError::NotFound {
                resource: "order",
                id: id.clone(),
            })?;
        if order.status.is_terminal() {
            return Err(
                ExchangeError::conflict(format!("order {id} is already terminal")).into(),
            );
        }
        if attempt + 1 < CANCEL_ATTEMPTS {
            tokio::time::sleep(CANCEL_RETRY_DELAY).await;
        }
    }
    Err(ExchangeError::conflict(format!(
        "order {id} is locked by a fill in progress, retry"
    ))
    .into())
}

pub(super) async fn user_orders(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut orders = state.store.get_user_orders(&address);
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(json!({ "success": true, "orders": orders })))
}
