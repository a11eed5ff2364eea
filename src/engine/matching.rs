//! The per-book matching walk.
//!
//! For one `(market, outcome-position)` book the engine pairs demand (orders
//! receiving the outcome token) against supply (orders surrendering it) in
//! strict price-time order. Orders whose own quote frame is the
//! complementary outcome participate at the complementary price, which is
//! what lets two buys (a mint) or two sells (a merge) of opposite outcomes
//! cross.

use super::MatchingEngine;
use crate::error::ExchangeError;
use crate::pricing::{MINT_MERGE_EPSILON, PRICE_SCALE, complement, mid_price};
use crate::types::{Hex32, Market, Order, Side, Trade, TradeType};
use crate::utils::current_time_millis;
use tracing::{debug, warn};
use uuid::Uuid;

/// Lock-holder identity the engine records on order locks.
const ENGINE_HOLDER: &str = "matching-engine";

/// One order viewed through a book's quote frame.
struct BookEntry {
    order: Order,
    /// The order's price expressed in the walked book's outcome frame.
    effective_price: u64,
    /// Unfilled size as tracked by this walk.
    remaining: u64,
}

impl BookEntry {
    fn new(order: Order, book_position: Hex32) -> Self {
        let effective_price = if order.book_position_id() == book_position {
            order.price
        } else {
            complement(order.price)
        };
        let remaining = order.remaining_size;
        Self {
            order,
            effective_price,
            remaining,
        }
    }

    fn time_key(&self) -> (u64, u64) {
        (self.order.created_at, self.order.seq)
    }
}

/// Classify a matched pair. Two buys of complementary outcomes whose prices
/// sum to the scale (within epsilon) mint a fresh pair; two sells merge one
/// back to collateral; everything else is a normal swap. This is a tag on an
/// already-matched pair, never a reason to match.
fn classify(demand: &Order, supply: &Order) -> TradeType {
    let sum = demand.price + supply.price;
    let near_scale = sum.abs_diff(PRICE_SCALE) <= MINT_MERGE_EPSILON;
    match (demand.side, supply.side) {
        (Side::Buy, Side::Buy) if near_scale => TradeType::Mint,
        (Side::Sell, Side::Sell) if near_scale => TradeType::Merge,
        _ => TradeType::Normal,
    }
}

impl MatchingEngine {
    /// Match one book: load, sort price-time, walk, fill, settle, and update
    /// the market price when anything printed.
    pub(super) async fn match_book(
        &self,
        market_id: &str,
        position_id: Hex32,
    ) -> Result<(), ExchangeError> {
        let market = self
            .store
            .get_market(market_id)
            .ok_or_else(|| ExchangeError::NotFound {
                resource: "market",
                id: market_id.to_string(),
            })?;

        let (mut demand, mut supply) = self.load_sides(&market, position_id);
        let mut demand_idx = 0usize;
        let mut supply_idx = 0usize;
        let mut last_price = None;
        let mut notional: u64 = 0;

        while demand_idx < demand.len() && supply_idx < supply.len() {
            let bid = &demand[demand_idx];
            let ask = &supply[supply_idx];
            if bid.effective_price < ask.effective_price {
                break;
            }

            let fill = bid.remaining.min(ask.remaining);
            let (maker, taker) = if bid.time_key() <= ask.time_key() {
                (bid, ask)
            } else {
                (ask, bid)
            };
            let price = maker.effective_price;
            let trade = Trade {
                trade_id: Uuid::new_v4().to_string(),
                market_id: market.market_id.clone(),
                condition_id: market.condition_id,
                position_id,
                maker_position_id: maker.order.maker_position_id,
                taker_position_id: maker.order.taker_position_id,
                maker: maker.order.maker.clone(),
                taker: taker.order.maker.clone(),
                price,
                size: fill,
                side: taker.order.side,
                maker_order_id: maker.order.order_id.clone(),
                taker_order_id: taker.order.order_id.clone(),
                trade_type: classify(&bid.order, &ask.order),
                timestamp: current_time_millis(),
                tx_hash: None,
            };
            let maker_order = maker.order.clone();
            let taker_order = taker.order.clone();

            let bid_filled = self
                .store
                .fill_order(&demand[demand_idx].order.order_id, fill, ENGINE_HOLDER)
                .await?;
            let ask_filled = if bid_filled {
                self.store
                    .fill_order(&supply[supply_idx].order.order_id, fill, ENGINE_HOLDER)
                    .await?
            } else {
                false
            };
            if !bid_filled || !ask_filled {
                warn!(
                    market = %market.market_id,
                    position = %position_id,
                    trade = %trade.trade_id,
                    bid_filled,
                    ask_filled,
                    "fill write failed, leaving book for next tick"
                );
                return Ok(());
            }

            debug!(
                trade = %trade.trade_id,
                market = %market.market_id,
                price,
                size = fill,
                trade_type = %trade.trade_type,
                "trade"
            );
            last_price = Some(price);
            notional = notional.saturating_add(trade.notional());
            let trade_id = trade.trade_id.clone();
            self.trades.insert(trade);
            self.settle(&trade_id, &maker_order, &taker_order, fill).await;

            demand[demand_idx].remaining -= fill;
            supply[supply_idx].remaining -= fill;
            if demand[demand_idx].remaining == 0 {
                demand_idx += 1;
            }
            if supply[supply_idx].remaining == 0 {
                supply_idx += 1;
            }
        }

        if let Some(last) = last_price {
            let best_bid = demand[demand_idx..]
                .iter()
                .find(|e| e.remaining > 0)
                .map(|e| e.effective_price);
            let best_ask = supply[supply_idx..]
                .iter()
                .find(|e| e.remaining > 0)
                .map(|e| e.effective_price);
            self.update_market_price(&market, position_id, best_bid, best_ask, last, notional)
                .await?;
        }
        Ok(())
    }

    /// Load the demand and supply queues of one book, sorted price-time.
    ///
    /// Demand is every resting order that receives the book's outcome token;
    /// supply every resting order that surrenders it. Entries quoted in the
    /// complementary frame carry their complementary price.
    fn load_sides(&self, market: &Market, position_id: Hex32) -> (Vec<BookEntry>, Vec<BookEntry>) {
        let mut demand = Vec::new();
        let mut supply = Vec::new();
        for order in self.store.get_market_orders(&market.market_id) {
            if !order.status.is_resting() || order.remaining_size == 0 {
                continue;
            }
            if order.taker_position_id == position_id {
                demand.push(BookEntry::new(order, position_id));
            } else if order.maker_position_id == position_id {
                supply.push(BookEntry::new(order, position_id));
            }
        }
        demand.sort_by(|a, b| {
            b.effective_price
                .cmp(&a.effective_price)
                .then_with(|| a.time_key().cmp(&b.time_key()))
        });
        supply.sort_by(|a, b| {
            a.effective_price
                .cmp(&b.effective_price)
                .then_with(|| a.time_key().cmp(&b.time_key()))
        });
        (demand, supply)
    }

    async fn update_market_price(
        &self,
        market: &Market,
        position_id: Hex32,
        best_bid: Option<u64>,
        best_ask: Option<u64>,
        last_price: u64,
        notional: u64,
    ) -> Result<(), ExchangeError> {
        let is_yes = position_id == market.yes_position_id;
        let current = if is_yes {
            market.yes_price
        } else {
            market.no_price
        };
        let book_price = mid_price(best_bid, best_ask, Some(last_price), current);
        let yes_price = if is_yes {
            book_price
        } else {
            complement(book_price)
        };
        self.store
            .update_market_prices(&market.market_id, yes_price, complement(yes_price))
            .await?;
        self.store
            .record_volume(&market.market_id, notional)
            .await?;
        Ok(())
    }

    /// Hand a trade to the settlement bridge, best-effort. Failures are
    /// logged and never revert the fill; the trade stays recorded without a
    /// transaction id and can be re-submitted through the admin path.
    async fn settle(&self, trade_id: &str, maker: &Order, taker: &Order, fill: u64) {
        let Some(trade) = self.trades.get(trade_id) else {
            return;
        };
        match self.settlement.settle_trade(&trade, maker, taker, fill).await {
            Ok(tx_hash) => {
                self.trades.set_tx_hash(trade_id, &tx_hash);
            }
            Err(ExchangeError::SettlementDisabled) => {
                debug!(trade = trade_id, "settlement disabled, trade recorded unsettled");
            }
            Err(err) => {
                warn!(trade = trade_id, error = %err, "settlement failed, fill stands");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderStatus;

    fn raw_order(side: Side, price: u64, maker_pos: u8, taker_pos: u8) -> Order {
        Order {
            order_id: "o".to_string(),
            maker: "maker".to_string(),
            market_id: "m".to_string(),
            condition_id: Hex32([0; 32]),
            maker_position_id: Hex32([maker_pos; 32]),
            taker_position_id: Hex32([taker_pos; 32]),
            side,
            price,
            size: 100,
            filled_size: 0,
            remaining_size: 100,
            status: OrderStatus::Open,
            salt: "1".to_string(),
            expiration: 0,
            created_at: 0,
            updated_at: 0,
            signature: None,
            public_key: None,
            seq: 0,
        }
    }

    #[test]
    fn test_classify_mint() {
        // Buy YES at 600k vs buy NO at 400k: prices sum to the scale.
        let buy_yes = raw_order(Side::Buy, 600_000, 2, 1);
        let buy_no = raw_order(Side::Buy, 400_000, 1, 2);
        assert_eq!(classify(&buy_yes, &buy_no), TradeType::Mint);
    }

    #[test]
    fn test_classify_merge() {
        let sell_no = raw_order(Side::Sell, 650_000, 2, 1);
        let sell_yes = raw_order(Side::Sell, 350_000, 1, 2);
        assert_eq!(classify(&sell_no, &sell_yes), TradeType::Merge);
    }

    #[test]
    fn test_classify_normal_when_sum_off_scale() {
        let buy_yes = raw_order(Side::Buy, 700_000, 2, 1);
        let buy_no = raw_order(Side::Buy, 400_000, 1, 2);
        assert_eq!(classify(&buy_yes, &buy_no), TradeType::Normal);
    }

    #[test]
    fn test_classify_epsilon_boundary_inclusive() {
        // Sum exactly epsilon over the scale still mints.
        let buy_yes = raw_order(Side::Buy, 600_000, 2, 1);
        let buy_no = raw_order(Side::Buy, 410_000, 1, 2);
        assert_eq!(classify(&buy_yes, &buy_no), TradeType::Mint);

        // One micro-sat further and the tag degrades to a normal swap.
        let buy_no_over = raw_order(Side::Buy, 410_001, 1, 2);
        assert_eq!(classify(&buy_yes, &buy_no_over), TradeType::Normal);
    }

    #[test]
    fn test_classify_normal_mixed_sides() {
        let buy_yes = raw_order(Side::Buy, 700_000, 2, 1);
        let sell_yes = raw_order(Side::Sell, 660_000, 1, 2);
        assert_eq!(classify(&buy_yes, &sell_yes), TradeType::Normal);
    }

    #[test]
    fn test_effective_price_flips_for_complementary_frame() {
        let book = Hex32([1; 32]);
        // Buy of this book's token keeps its raw price.
        let bid = BookEntry::new(raw_order(Side::Buy, 600_000, 2, 1), book);
        assert_eq!(bid.effective_price, 600_000);
        // Buy of the complementary token supplies this book at the
        // complementary price.
        let cross = BookEntry::new(raw_order(Side::Buy, 400_000, 1, 2), book);
        assert_eq!(cross.effective_price, 600_000);
    }
}
