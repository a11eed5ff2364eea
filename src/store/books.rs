//! Price-sorted book views.
//!
//! Each `(market, outcome-position)` pair owns two skip-list views, one per
//! side, keyed by `(price, seq)`. The skip list keeps prices ordered at all
//! times, so building an aggregated book is a single ordered scan; `seq` is
//! the process-wide insertion sequence and makes same-price ordering
//! deterministic.

use crate::types::{Hex32, Order, Side};
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use std::sync::Arc;

/// Sort key of a book entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BookKey {
    /// Price in micro-sats.
    pub price: u64,
    /// Insertion sequence, ascending within a price level.
    pub seq: u64,
}

/// The two sorted sides of one outcome book. Values are order ids; order
/// bodies live in the primary map.
#[derive(Default)]
pub struct OutcomeBook {
    /// Buy entries; iterate in reverse for best (highest) first.
    pub bids: SkipMap<BookKey, String>,
    /// Sell entries; natural order is best (lowest) first.
    pub asks: SkipMap<BookKey, String>,
}

/// All books of the exchange, keyed by `(market_id, book_position_id)`.
#[derive(Default)]
pub struct BookIndex {
    books: DashMap<(String, Hex32), Arc<OutcomeBook>>,
}

impl BookIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// The book for a `(market, position)` pair, creating it lazily.
    pub fn book(&self, market_id: &str, position_id: Hex32) -> Arc<OutcomeBook> {
        self.books
            .entry((market_id.to_string(), position_id))
            .or_default()
            .clone()
    }

    /// The book for a `(market, position)` pair, if it has ever held entries.
    pub fn get(&self, market_id: &str, position_id: Hex32) -> Option<Arc<OutcomeBook>> {
        self.books
            .get(&(market_id.to_string(), position_id))
            .map(|entry| entry.value().clone())
    }

    /// Insert an order into its book under the canonical key.
    pub fn insert(&self, order: &Order) {
        let book = self.book(&order.market_id, order.book_position_id());
        let key = BookKey {
            price: order.price,
            seq: order.seq,
        };
        match order.side {
            Side::Buy => {
                book.bids.insert(key, order.order_id.clone());
            }
            Side::Sell => {
                book.asks.insert(key, order.order_id.clone());
            }
        }
    }

    /// Remove an order from its book.
    pub fn remove(&self, order: &Order) {
        if let Some(book) = self.get(&order.market_id, order.book_position_id()) {
            let key = BookKey {
                price: order.price,
                seq: order.seq,
            };
            match order.side {
                Side::Buy => {
                    book.bids.remove(&key);
                }
                Side::Sell => {
                    book.asks.remove(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_key_orders_by_price_then_seq() {
        let a = BookKey { price: 100, seq: 5 };
        let b = BookKey { price: 100, seq: 6 };
        let c = BookKey { price: 101, seq: 1 };
        assert!(a < b);
        assert!(b < c);
    }
}
