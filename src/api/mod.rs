//! HTTP/JSON surface.
//!
//! A thin boundary over the core: handlers validate and translate, the
//! store/engine/router/bridge do the work. Every response body carries
//! `{"success": bool}` and failures add `"error"` (and the failed `"plan"`
//! where the smart router produced one).

mod admin;
mod markets;
mod orderbook;
mod orders;
mod smart_orders;

use crate::engine::TradeLog;
use crate::error::ExchangeError;
use crate::settlement::SettlementBridge;
use crate::store::OrderStore;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The hot store.
    pub store: Arc<OrderStore>,
    /// The in-memory trade log.
    pub trades: Arc<TradeLog>,
    /// The settlement bridge.
    pub settlement: Arc<SettlementBridge>,
    /// Admin shared secret; `None` disables admin endpoints.
    pub admin_api_key: Option<String>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/markets", get(markets::list).post(markets::create))
        .route("/api/markets/:id", get(markets::get_one))
        .route("/api/markets/:id/stats", get(markets::stats))
        .route("/api/markets/:id/price-history", get(markets::price_history))
        .route("/api/orderbook/:id", get(orderbook::get_books))
        .route("/api/orderbook/:id/trades", get(orderbook::recent_trades))
        .route("/api/orderbook/:id/price", get(orderbook::price))
        .route("/api/orders/:id", get(orders::get_one))
        .route("/api/orders/:id/cancel", post(orders::cancel))
        .route("/api/users/:address/orders", get(orders::user_orders))
        .route("/api/smart-orders", post(smart_orders::place))
        .route("/api/smart-orders/preview", post(smart_orders::preview))
        .route(
            "/api/smart-orders/requirements",
            post(smart_orders::requirements),
        )
        .route(
            "/api/admin/settlements/:trade_id",
            post(admin::force_settle),
        )
        .route("/api/admin/markets/:id/resolve", post(admin::resolve_market))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "status": "ok",
        "settlementEnabled": state.settlement.is_enabled(),
    }))
}

/// Error wrapper that renders the exchange taxonomy as HTTP.
pub struct ApiError(pub ExchangeError);

impl From<ExchangeError> for ApiError {
    fn from(err: ExchangeError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ExchangeError::InvalidArgument { .. }
            | ExchangeError::InvalidOrder { .. }
            | ExchangeError::BadSignature { .. }
            | ExchangeError::Conflict { .. }
            | ExchangeError::InsufficientLiquidity { .. }
            | ExchangeError::SlippageExceeded { .. }
            | ExchangeError::SettlementDisabled => StatusCode::BAD_REQUEST,
            ExchangeError::NotFound { .. } => StatusCode::NOT_FOUND,
            ExchangeError::Unauthorized => StatusCode::UNAUTHORIZED,
            ExchangeError::Forbidden => StatusCode::FORBIDDEN,
            ExchangeError::SettlementRejected { .. }
            | ExchangeError::Store { .. }
            | ExchangeError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut body = json!({
            "success": false,
            "error": self.0.to_string(),
        });
        if let Some(plan) = self.0.plan() {
            body["plan"] = serde_json::to_value(plan).unwrap_or_default();
        }
        (status, Json(body)).into_response()
    }
}

/// Check the admin shared secret on `x-admin-key` or `x-api-key`.
pub(crate) fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ExchangeError> {
    let presented = headers
        .get("x-admin-key")
        .or_else(|| headers.get("x-api-key"))
        .and_then(|value| value.to_str().ok());
    let Some(presented) = presented else {
        return Err(ExchangeError::Unauthorized);
    };
    match &state.admin_api_key {
        Some(expected) if presented == expected => Ok(()),
        _ => Err(ExchangeError::Forbidden),
    }
}
