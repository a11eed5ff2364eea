//! In-memory trade log.

use crate::pricing::complement;
use crate::types::{Market, Trade};
use dashmap::DashMap;
use serde::Serialize;

/// All trades of the process, indexed by id and by market in print order.
#[derive(Default)]
pub struct TradeLog {
    trades: DashMap<String, Trade>,
    by_market: DashMap<String, Vec<String>>,
}

/// One OHLC bucket of YES-normalized trade prices.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OhlcBucket {
    /// Bucket start, milliseconds since the Unix epoch.
    pub start: u64,
    /// First YES price in the bucket.
    pub open: u64,
    /// Highest YES price in the bucket.
    pub high: u64,
    /// Lowest YES price in the bucket.
    pub low: u64,
    /// Last YES price in the bucket.
    pub close: u64,
    /// Total traded size in the bucket.
    pub volume: u64,
}

impl TradeLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trade.
    pub fn insert(&self, trade: Trade) {
        self.by_market
            .entry(trade.market_id.clone())
            .or_default()
            .push(trade.trade_id.clone());
        self.trades.insert(trade.trade_id.clone(), trade);
    }

    /// Look up a trade by id.
    pub fn get(&self, trade_id: &str) -> Option<Trade> {
        self.trades.get(trade_id).map(|t| t.clone())
    }

    /// Record the settlement transaction id on a trade. Returns `false`
    /// when the trade is unknown.
    pub fn set_tx_hash(&self, trade_id: &str, tx_hash: &str) -> bool {
        match self.trades.get_mut(trade_id) {
            Some(mut trade) => {
                trade.tx_hash = Some(tx_hash.to_string());
                true
            }
            None => false,
        }
    }

    /// Number of trades printed in a market.
    pub fn market_trade_count(&self, market_id: &str) -> usize {
        self.by_market
            .get(market_id)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }

    /// A market's trades in print order.
    pub fn market_trades(&self, market_id: &str) -> Vec<Trade> {
        self.by_market
            .get(market_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.trades.get(id).map(|t| t.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A market's most recent trades, newest first.
    pub fn recent(&self, market_id: &str, limit: usize) -> Vec<Trade> {
        let mut trades = self.market_trades(market_id);
        trades.reverse();
        trades.truncate(limit);
        trades
    }

    /// The last trade printed in a market.
    pub fn last_trade(&self, market_id: &str) -> Option<Trade> {
        let ids = self.by_market.get(market_id)?;
        let last = ids.last()?;
        self.trades.get(last).map(|t| t.clone())
    }

    /// OHLC buckets of YES-normalized prices for a market, oldest first,
    /// at most `limit` buckets counted back from the newest trade.
    pub fn price_history(
        &self,
        market: &Market,
        interval_ms: u64,
        limit: usize,
    ) -> Vec<OhlcBucket> {
        let interval_ms = interval_ms.max(1);
        let mut buckets: Vec<OhlcBucket> = Vec::new();
        for trade in self.market_trades(&market.market_id) {
            let price = if trade.position_id == market.yes_position_id {
                trade.price
            } else {
                complement(trade.price)
            };
            let start = trade.timestamp - trade.timestamp % interval_ms;
            match buckets.last_mut() {
                Some(bucket) if bucket.start == start => {
                    bucket.high = bucket.high.max(price);
                    bucket.low = bucket.low.min(price);
                    bucket.close = price;
                    bucket.volume += trade.size;
                }
                _ => buckets.push(OhlcBucket {
                    start,
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                    volume: trade.size,
                }),
            }
        }
        if buckets.len() > limit {
            buckets.drain(..buckets.len() - limit);
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hex32, Side, TradeType};

    fn make_trade(id: &str, market: &str, price: u64, size: u64, at: u64) -> Trade {
        Trade {
            trade_id: id.to_string(),
            market_id: market.to_string(),
            condition_id: Hex32([0; 32]),
            position_id: Hex32([1; 32]),
            maker_position_id: Hex32([2; 32]),
            taker_position_id: Hex32([1; 32]),
            maker: "maker".to_string(),
            taker: "taker".to_string(),
            price,
            size,
            side: Side::Buy,
            maker_order_id: "m".to_string(),
            taker_order_id: "t".to_string(),
            trade_type: TradeType::Normal,
            timestamp: at,
            tx_hash: None,
        }
    }

    fn yes_market(market_id: &str) -> Market {
        Market {
            market_id: market_id.to_string(),
            condition_id: Hex32([0; 32]),
            question: "?".to_string(),
            creator: "creator".to_string(),
            yes_position_id: Hex32([1; 32]),
            no_position_id: Hex32([2; 32]),
            yes_price: 500_000,
            no_price: 500_000,
            volume_24h: 0,
            created_at: 0,
            resolved: false,
            outcome: None,
        }
    }

    #[test]
    fn test_recent_is_newest_first() {
        let log = TradeLog::new();
        log.insert(make_trade("t1", "m", 600_000, 10, 1_000));
        log.insert(make_trade("t2", "m", 610_000, 20, 2_000));
        let recent = log.recent("m", 10);
        assert_eq!(recent[0].trade_id, "t2");
        assert_eq!(recent[1].trade_id, "t1");
        assert_eq!(log.recent("m", 1).len(), 1);
    }

    #[test]
    fn test_set_tx_hash() {
        let log = TradeLog::new();
        log.insert(make_trade("t1", "m", 600_000, 10, 1_000));
        assert!(log.set_tx_hash("t1", "0xabc"));
        assert_eq!(log.get("t1").unwrap().tx_hash.as_deref(), Some("0xabc"));
        assert!(!log.set_tx_hash("missing", "0xabc"));
    }

    #[test]
    fn test_price_history_buckets() {
        let log = TradeLog::new();
        let market = yes_market("m");
        log.insert(make_trade("t1", "m", 600_000, 10, 60_500));
        log.insert(make_trade("t2", "m", 650_000, 5, 60_900));
        log.insert(make_trade("t3", "m", 640_000, 1, 121_000));
        let buckets = log.price_history(&market, 60_000, 10);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].open, 600_000);
        assert_eq!(buckets[0].close, 650_000);
        assert_eq!(buckets[0].high, 650_000);
        assert_eq!(buckets[0].volume, 15);
        assert_eq!(buckets[1].open, 640_000);
    }

    #[test]
    fn test_price_history_normalizes_no_frame() {
        let log = TradeLog::new();
        let market = yes_market("m");
        let mut trade = make_trade("t1", "m", 400_000, 10, 1_000);
        trade.position_id = market.no_position_id;
        log.insert(trade);
        let buckets = log.price_history(&market, 60_000, 10);
        assert_eq!(buckets[0].close, 600_000);
    }
}
