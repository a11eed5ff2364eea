//! Block-height expiration sweeps.

mod common;

use common::{engine_for, place, place_expiring, store_with_market};
use prediction_clob::monitor::expire_below;
use prediction_clob::types::{Outcome, OrderStatus, Side};

#[tokio::test]
async fn test_orders_below_height_expire() {
    let (store, market) = store_with_market().await;
    let expiring = place_expiring(&store, &market, Side::Sell, Outcome::Yes, 660_000, 100, 1_000).await;
    let open_ended = place(&store, &market, Side::Sell, Outcome::Yes, 670_000, 100).await;

    expire_below(&store, 1_001).await;

    assert_eq!(
        store.get_order(&expiring.order_id).unwrap().status,
        OrderStatus::Expired
    );
    // Expiration zero means no expiration.
    assert_eq!(
        store.get_order(&open_ended.order_id).unwrap().status,
        OrderStatus::Open
    );

    let book = store.get_orderbook(&market.market_id, market.yes_position_id);
    assert_eq!(book.asks.len(), 1);
    assert_eq!(book.best_ask(), Some(670_000));
}

#[tokio::test]
async fn test_expiration_bound_is_strict() {
    let (store, market) = store_with_market().await;
    let at_height = place_expiring(&store, &market, Side::Sell, Outcome::Yes, 660_000, 100, 1_001).await;

    expire_below(&store, 1_001).await;

    // An order expiring exactly at the height still rests.
    assert_eq!(
        store.get_order(&at_height.order_id).unwrap().status,
        OrderStatus::Open
    );
}

#[tokio::test]
async fn test_sweep_retries_contended_orders_on_next_pass() {
    let (store, market) = store_with_market().await;
    let order =
        place_expiring(&store, &market, Side::Sell, Outcome::Yes, 660_000, 100, 1_000).await;

    // With the order's lock held by a fill in flight, the sweep leaves it
    // alone instead of failing.
    assert!(store.locks().try_acquire(&order.order_id, "matching-engine"));
    expire_below(&store, 1_001).await;
    assert_eq!(
        store.get_order(&order.order_id).unwrap().status,
        OrderStatus::Open
    );

    // The next pass finds the lock free and expires it.
    store.locks().release(&order.order_id, "matching-engine");
    expire_below(&store, 1_001).await;
    assert_eq!(
        store.get_order(&order.order_id).unwrap().status,
        OrderStatus::Expired
    );
}

#[tokio::test]
async fn test_expired_orders_never_match() {
    let (store, market) = store_with_market().await;
    let (engine, trades) = engine_for(store.clone());

    place_expiring(&store, &market, Side::Sell, Outcome::Yes, 660_000, 100, 1_000).await;
    expire_below(&store, 1_001).await;

    // A crossing buy arriving after the sweep finds nothing to hit.
    place(&store, &market, Side::Buy, Outcome::Yes, 700_000, 50).await;
    engine.tick().await;

    assert!(trades.market_trades(&market.market_id).is_empty());
    let book = store.get_orderbook(&market.market_id, market.yes_position_id);
    assert_eq!(book.best_bid(), Some(700_000));
    assert!(book.asks.is_empty());
}
