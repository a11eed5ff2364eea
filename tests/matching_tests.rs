//! End-to-end matching scenarios through the engine tick.

mod common;

use common::{engine_for, place, store_with_market};
use prediction_clob::pricing::PRICE_SCALE;
use prediction_clob::types::{Outcome, OrderStatus, Side, TradeType};

#[tokio::test]
async fn test_crossed_limit_orders_fill_at_maker_price() {
    let (store, market) = store_with_market().await;
    let (engine, trades) = engine_for(store.clone());

    let sell = place(&store, &market, Side::Sell, Outcome::Yes, 660_000, 100).await;
    let buy = place(&store, &market, Side::Buy, Outcome::Yes, 700_000, 50).await;

    engine.tick().await;

    let tape = trades.market_trades(&market.market_id);
    assert_eq!(tape.len(), 1);
    let trade = &tape[0];
    assert_eq!(trade.price, 660_000);
    assert_eq!(trade.size, 50);
    assert_eq!(trade.trade_type, TradeType::Normal);
    assert_eq!(trade.maker_order_id, sell.order_id);
    assert_eq!(trade.taker_order_id, buy.order_id);
    assert_eq!(trade.side, Side::Buy);

    let buy = store.get_order(&buy.order_id).unwrap();
    assert_eq!(buy.status, OrderStatus::Filled);
    assert_eq!(buy.filled_size, 50);
    assert_eq!(buy.remaining_size, 0);

    let sell = store.get_order(&sell.order_id).unwrap();
    assert_eq!(sell.status, OrderStatus::PartiallyFilled);
    assert_eq!(sell.remaining_size, 50);
    assert_eq!(sell.filled_size + sell.remaining_size, sell.size);

    // With the buy side exhausted, the last trade price drives the market.
    let market = store.get_market(&market.market_id).unwrap();
    assert_eq!(market.yes_price, 660_000);
    assert_eq!(market.yes_price + market.no_price, PRICE_SCALE);
}

#[tokio::test]
async fn test_price_time_priority_among_equal_prices() {
    let (store, market) = store_with_market().await;
    let (engine, trades) = engine_for(store.clone());

    let first = place(&store, &market, Side::Sell, Outcome::Yes, 650_000, 100).await;
    let second = place(&store, &market, Side::Sell, Outcome::Yes, 650_000, 100).await;
    place(&store, &market, Side::Buy, Outcome::Yes, 700_000, 150).await;

    engine.tick().await;

    let first = store.get_order(&first.order_id).unwrap();
    assert_eq!(first.status, OrderStatus::Filled);
    assert_eq!(first.filled_size, 100);

    let second = store.get_order(&second.order_id).unwrap();
    assert_eq!(second.status, OrderStatus::PartiallyFilled);
    assert_eq!(second.filled_size, 50);
    assert_eq!(second.remaining_size, 50);

    let tape = trades.market_trades(&market.market_id);
    assert_eq!(tape.len(), 2);
    assert!(tape.iter().all(|t| t.price == 650_000));
    assert_eq!(tape[0].maker_order_id, first.order_id);
    assert_eq!(tape[1].maker_order_id, second.order_id);
}

#[tokio::test]
async fn test_complementary_buys_mint_a_pair() {
    let (store, market) = store_with_market().await;
    let (engine, trades) = engine_for(store.clone());

    let buy_yes = place(&store, &market, Side::Buy, Outcome::Yes, 600_000, 100).await;
    let buy_no = place(&store, &market, Side::Buy, Outcome::No, 400_000, 100).await;

    engine.tick().await;

    let tape = trades.market_trades(&market.market_id);
    assert_eq!(tape.len(), 1);
    assert_eq!(tape[0].trade_type, TradeType::Mint);
    assert_eq!(tape[0].size, 100);

    assert_eq!(
        store.get_order(&buy_yes.order_id).unwrap().status,
        OrderStatus::Filled
    );
    assert_eq!(
        store.get_order(&buy_no.order_id).unwrap().status,
        OrderStatus::Filled
    );
}

#[tokio::test]
async fn test_complementary_sells_merge_a_pair() {
    let (store, market) = store_with_market().await;
    let (engine, trades) = engine_for(store.clone());

    let sell_yes = place(&store, &market, Side::Sell, Outcome::Yes, 350_000, 100).await;
    let sell_no = place(&store, &market, Side::Sell, Outcome::No, 650_000, 100).await;

    engine.tick().await;

    let tape = trades.market_trades(&market.market_id);
    assert_eq!(tape.len(), 1);
    assert_eq!(tape[0].trade_type, TradeType::Merge);

    assert_eq!(
        store.get_order(&sell_yes.order_id).unwrap().status,
        OrderStatus::Filled
    );
    assert_eq!(
        store.get_order(&sell_no.order_id).unwrap().status,
        OrderStatus::Filled
    );
}

#[tokio::test]
async fn test_non_crossing_orders_do_not_match() {
    let (store, market) = store_with_market().await;
    let (engine, trades) = engine_for(store.clone());

    place(&store, &market, Side::Sell, Outcome::Yes, 700_000, 100).await;
    place(&store, &market, Side::Buy, Outcome::Yes, 600_000, 100).await;

    engine.tick().await;

    assert!(trades.market_trades(&market.market_id).is_empty());
    let book = store.get_orderbook(&market.market_id, market.yes_position_id);
    assert_eq!(book.best_bid(), Some(600_000));
    assert_eq!(book.best_ask(), Some(700_000));
}

#[tokio::test]
async fn test_book_is_uncrossed_after_tick() {
    let (store, market) = store_with_market().await;
    let (engine, _) = engine_for(store.clone());

    place(&store, &market, Side::Sell, Outcome::Yes, 600_000, 80).await;
    place(&store, &market, Side::Sell, Outcome::Yes, 640_000, 80).await;
    place(&store, &market, Side::Buy, Outcome::Yes, 650_000, 100).await;
    place(&store, &market, Side::Buy, Outcome::Yes, 620_000, 100).await;

    engine.tick().await;

    let book = store.get_orderbook(&market.market_id, market.yes_position_id);
    if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
        assert!(bid < ask, "book still crossed: bid {bid} >= ask {ask}");
    }
}

#[tokio::test]
async fn test_partial_fill_then_cancel_keeps_filled_portion() {
    let (store, market) = store_with_market().await;
    let (engine, trades) = engine_for(store.clone());

    let sell = place(&store, &market, Side::Sell, Outcome::Yes, 660_000, 100).await;
    place(&store, &market, Side::Buy, Outcome::Yes, 700_000, 40).await;
    engine.tick().await;

    assert!(store.cancel_order(&sell.order_id).await.unwrap());
    let sell = store.get_order(&sell.order_id).unwrap();
    assert_eq!(sell.status, OrderStatus::Cancelled);
    assert_eq!(sell.filled_size, 40);
    assert_eq!(sell.remaining_size, 60);

    // The cancelled remainder can never match again.
    place(&store, &market, Side::Buy, Outcome::Yes, 700_000, 60).await;
    engine.tick().await;
    assert_eq!(trades.market_trades(&market.market_id).len(), 1);
}

#[tokio::test]
async fn test_resolved_markets_are_skipped() {
    let (store, market) = store_with_market().await;
    let (engine, trades) = engine_for(store.clone());

    place(&store, &market, Side::Sell, Outcome::Yes, 600_000, 100).await;
    store.resolve_market(&market.market_id, 0).await.unwrap();
    place_crossing_after_resolve(&store, &market).await;

    engine.tick().await;
    assert!(trades.market_trades(&market.market_id).is_empty());
}

async fn place_crossing_after_resolve(
    store: &prediction_clob::store::OrderStore,
    market: &prediction_clob::types::Market,
) {
    // Resolution rejects new orders; the book also stays quiet for the
    // engine.
    let result = store
        .add_order(prediction_clob::store::NewOrder {
            maker: common::principal(9),
            market_id: market.market_id.clone(),
            side: Side::Buy,
            price: 700_000,
            size: 100,
            maker_position_id: market.no_position_id,
            taker_position_id: market.yes_position_id,
            salt: "1".to_string(),
            expiration: 0,
            signature: None,
            public_key: None,
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_mint_with_price_surplus_is_tagged_normal() {
    let (store, market) = store_with_market().await;
    let (engine, trades) = engine_for(store.clone());

    // 700k + 400k leaves the pair 100k over the scale, far past epsilon.
    place(&store, &market, Side::Buy, Outcome::Yes, 700_000, 50).await;
    place(&store, &market, Side::Buy, Outcome::No, 400_000, 50).await;

    engine.tick().await;

    let tape = trades.market_trades(&market.market_id);
    assert_eq!(tape.len(), 1);
    assert_eq!(tape[0].trade_type, TradeType::Normal);
}
