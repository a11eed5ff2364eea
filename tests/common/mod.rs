//! Shared helpers for integration tests.
#![allow(dead_code)]

use prediction_clob::crypto::{c32, derive_position_id};
use prediction_clob::engine::{MatchingEngine, TradeLog};
use prediction_clob::settlement::SettlementBridge;
use prediction_clob::store::{NewOrder, OrderStore};
use prediction_clob::types::{Hex32, Market, Order, Outcome, Side};
use std::sync::Arc;

pub fn principal(seed: u8) -> String {
    c32::encode_address(26, &[seed; 20])
}

pub fn test_market() -> Market {
    let condition_id = Hex32([7u8; 32]);
    Market {
        market_id: "market-1".to_string(),
        condition_id,
        question: "Will it rain tomorrow?".to_string(),
        creator: principal(1),
        yes_position_id: derive_position_id(condition_id, 0),
        no_position_id: derive_position_id(condition_id, 1),
        yes_price: 500_000,
        no_price: 500_000,
        volume_24h: 0,
        created_at: 0,
        resolved: false,
        outcome: None,
    }
}

pub async fn store_with_market() -> (Arc<OrderStore>, Market) {
    let store = OrderStore::in_memory().unwrap();
    let market = test_market();
    store.add_market(market.clone()).await.unwrap();
    (store, market)
}

pub fn engine_for(store: Arc<OrderStore>) -> (Arc<MatchingEngine>, Arc<TradeLog>) {
    let trades = Arc::new(TradeLog::new());
    let engine = Arc::new(MatchingEngine::new(
        store,
        trades.clone(),
        Arc::new(SettlementBridge::disabled()),
    ));
    (engine, trades)
}

/// Place an unsigned resting order for `outcome` with the canonical
/// maker/taker position pair for its side.
pub async fn place(
    store: &OrderStore,
    market: &Market,
    side: Side,
    outcome: Outcome,
    price: u64,
    size: u64,
) -> Order {
    place_expiring(store, market, side, outcome, price, size, 0).await
}

pub async fn place_expiring(
    store: &OrderStore,
    market: &Market,
    side: Side,
    outcome: Outcome,
    price: u64,
    size: u64,
    expiration: u64,
) -> Order {
    let token = market.position_for_index(outcome.index()).unwrap();
    let opposite = market.opposite_position(token).unwrap();
    let (maker_position_id, taker_position_id) = match side {
        Side::Buy => (opposite, token),
        Side::Sell => (token, opposite),
    };
    store
        .add_order(NewOrder {
            maker: principal(9),
            market_id: market.market_id.clone(),
            side,
            price,
            size,
            maker_position_id,
            taker_position_id,
            salt: "1234".to_string(),
            expiration,
            signature: None,
            public_key: None,
        })
        .await
        .unwrap()
}
