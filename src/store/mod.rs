//! The hot order store and its durable mirror.
//!
//! Three access patterns are indexed: by order id, by market, and by maker,
//! plus a price-sorted view per `(market, outcome-position, side)` book.
//! Writes to one order are serialized through a per-order try-lock; every
//! mutation invalidates the affected book's snapshot cache and writes a
//! mirror row before returning.

mod books;
mod locks;
mod mirror;

pub use books::{BookIndex, BookKey, OutcomeBook};
pub use locks::OrderLockTable;
pub use mirror::Mirror;

use crate::crypto;
use crate::error::ExchangeError;
use crate::pricing::PRICE_SCALE;
use crate::types::{Hex32, Market, Order, OrderStatus, OrderbookLevel, OrderbookView, Side};
use crate::utils::current_time_millis;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How long a cached orderbook snapshot stays valid.
const SNAPSHOT_TTL_MS: u64 = 10_000;

/// Input for accepting a new order. Identity, fill counters, and timestamps
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The signing principal.
    pub maker: String,
    /// Target market.
    pub market_id: String,
    /// Buy or sell.
    pub side: Side,
    /// Limit price in micro-sats.
    pub price: u64,
    /// Size in token units.
    pub size: u64,
    /// Token the maker surrenders.
    pub maker_position_id: Hex32,
    /// Token the maker receives.
    pub taker_position_id: Hex32,
    /// Numeric salt bound into the order hash.
    pub salt: String,
    /// Expiration block height, `0` for none.
    pub expiration: u64,
    /// RSV signature, if the order is signed.
    pub signature: Option<String>,
    /// Compressed public key for the signature.
    pub public_key: Option<String>,
}

struct CachedView {
    at: u64,
    view: OrderbookView,
}

/// The shared hot store: orders, markets, indices, sorted books, per-order
/// locks, snapshot cache, and the durable mirror.
pub struct OrderStore {
    orders: DashMap<String, Order>,
    market_index: DashMap<String, Vec<String>>,
    maker_index: DashMap<String, Vec<String>>,
    books: BookIndex,
    markets: DashMap<String, Market>,
    locks: OrderLockTable,
    snapshot_cache: DashMap<(String, Hex32), CachedView>,
    mirror: Mirror,
    seq: AtomicU64,
}

impl OrderStore {
    /// Create a store over the given mirror.
    pub fn new(mirror: Mirror) -> Self {
        Self {
            orders: DashMap::new(),
            market_index: DashMap::new(),
            maker_index: DashMap::new(),
            books: BookIndex::new(),
            markets: DashMap::new(),
            locks: OrderLockTable::new(),
            snapshot_cache: DashMap::new(),
            mirror,
            seq: AtomicU64::new(1),
        }
    }

    /// A store backed by an in-memory mirror, for tests and ephemeral runs.
    pub fn in_memory() -> Result<Arc<Self>, ExchangeError> {
        Ok(Arc::new(Self::new(Mirror::in_memory()?)))
    }

    /// The per-order lock table. Every writer of fill state, the matching
    /// engine included, serializes through these locks.
    pub fn locks(&self) -> &OrderLockTable {
        &self.locks
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn invalidate_snapshot(&self, market_id: &str, position_id: Hex32) {
        self.snapshot_cache
            .remove(&(market_id.to_string(), position_id));
    }

    /// Register a market and persist it.
    pub async fn add_market(&self, market: Market) -> Result<(), ExchangeError> {
        if market.yes_price.saturating_add(market.no_price) != PRICE_SCALE {
            return Err(ExchangeError::invalid(format!(
                "yes and no prices must sum to {PRICE_SCALE}"
            )));
        }
        if self.markets.contains_key(&market.market_id) {
            return Err(ExchangeError::conflict(format!(
                "market {} already exists",
                market.market_id
            )));
        }
        self.mirror.upsert_market(&market).await?;
        info!(market = %market.market_id, "market registered");
        self.markets.insert(market.market_id.clone(), market);
        Ok(())
    }

    /// Look up a market.
    pub fn get_market(&self, market_id: &str) -> Option<Market> {
        self.markets.get(market_id).map(|m| m.clone())
    }

    /// All markets, in no particular order.
    pub fn get_all_markets(&self) -> Vec<Market> {
        self.markets.iter().map(|m| m.clone()).collect()
    }

    /// Set a market's complementary prices.
    pub async fn update_market_prices(
        &self,
        market_id: &str,
        yes_price: u64,
        no_price: u64,
    ) -> Result<(), ExchangeError> {
        if yes_price.saturating_add(no_price) != PRICE_SCALE {
            return Err(ExchangeError::invalid(format!(
                "yes and no prices must sum to {PRICE_SCALE}"
            )));
        }
        let updated = {
            let mut entry = self.markets.get_mut(market_id).ok_or_else(|| {
                ExchangeError::NotFound {
                    resource: "market",
                    id: market_id.to_string(),
                }
            })?;
            entry.yes_price = yes_price;
            entry.no_price = no_price;
            entry.clone()
        };
        self.mirror.upsert_market(&updated).await
    }

    /// Add traded notional to a market's volume counter.
    pub async fn record_volume(&self, market_id: &str, notional: u64) -> Result<(), ExchangeError> {
        let updated = {
            let mut entry = self.markets.get_mut(market_id).ok_or_else(|| {
                ExchangeError::NotFound {
                    resource: "market",
                    id: market_id.to_string(),
                }
            })?;
            entry.volume_24h = entry.volume_24h.saturating_add(notional);
            entry.clone()
        };
        self.mirror.upsert_market(&updated).await
    }

    /// Resolve a market to an outcome and cancel all of its resting orders.
    /// Returns the cancelled order ids.
    pub async fn resolve_market(
        &self,
        market_id: &str,
        outcome: u8,
    ) -> Result<Vec<String>, ExchangeError> {
        let updated = {
            let mut entry = self.markets.get_mut(market_id).ok_or_else(|| {
                ExchangeError::NotFound {
                    resource: "market",
                    id: market_id.to_string(),
                }
            })?;
            if entry.resolved {
                return Err(ExchangeError::conflict(format!(
                    "market {market_id} already resolved"
                )));
            }
            entry.resolved = true;
            entry.outcome = Some(outcome);
            entry.clone()
        };
        self.mirror.upsert_market(&updated).await?;

        let mut cancelled = Vec::new();
        for order in self.get_market_orders(market_id) {
            if order.status.is_resting() && self.cancel_order(&order.order_id).await? {
                cancelled.push(order.order_id);
            }
        }
        info!(
            market = market_id,
            outcome,
            cancelled = cancelled.len(),
            "market resolved"
        );
        Ok(cancelled)
    }

    /// Accept a new order: validate the data-model invariants, allocate an
    /// id, index it, enter it into its sorted book, and persist it.
    ///
    /// # Errors
    /// [`ExchangeError::InvalidOrder`] when any invariant is violated,
    /// [`ExchangeError::NotFound`] when the market does not exist.
    pub async fn add_order(&self, input: NewOrder) -> Result<Order, ExchangeError> {
        let market =
            self.get_market(&input.market_id)
                .ok_or_else(|| ExchangeError::NotFound {
                    resource: "market",
                    id: input.market_id.clone(),
                })?;
        if market.resolved {
            return Err(ExchangeError::invalid_order(format!(
                "market {} is resolved",
                market.market_id
            )));
        }
        if input.size == 0 {
            return Err(ExchangeError::invalid_order("size must be at least 1"));
        }
        if input.price == 0 || input.price >= PRICE_SCALE {
            return Err(ExchangeError::invalid_order(format!(
                "price must be strictly between 0 and {PRICE_SCALE}"
            )));
        }
        if input.maker_position_id == input.taker_position_id {
            return Err(ExchangeError::invalid_order(
                "maker and taker positions must differ",
            ));
        }
        if !market.has_position(input.maker_position_id)
            || !market.has_position(input.taker_position_id)
        {
            return Err(ExchangeError::invalid_order(
                "position ids do not belong to the market",
            ));
        }
        if input.salt.parse::<u128>().is_err() {
            return Err(ExchangeError::invalid_order(format!(
                "salt is not numeric: {:?}",
                input.salt
            )));
        }
        if let Some(signature) = &input.signature {
            if !crypto::is_rsv_hex(signature) {
                return Err(ExchangeError::invalid_order(
                    "signature must be 130 hex chars",
                ));
            }
        }

        let now = current_time_millis();
        let order = Order {
            order_id: Uuid::new_v4().to_string(),
            maker: input.maker,
            market_id: input.market_id,
            condition_id: market.condition_id,
            maker_position_id: input.maker_position_id,
            taker_position_id: input.taker_position_id,
            side: input.side,
            price: input.price,
            size: input.size,
            filled_size: 0,
            remaining_size: input.size,
            status: OrderStatus::Open,
            salt: input.salt,
            expiration: input.expiration,
            created_at: now,
            updated_at: now,
            signature: input.signature,
            public_key: input.public_key,
            seq: self.next_seq(),
        };

        self.mirror.upsert_order(&order).await?;
        self.index_order(&order);
        debug!(
            order = %order.order_id,
            market = %order.market_id,
            side = %order.side,
            price = order.price,
            size = order.size,
            "order accepted"
        );
        Ok(order)
    }

    fn index_order(&self, order: &Order) {
        self.orders.insert(order.order_id.clone(), order.clone());
        self.market_index
            .entry(order.market_id.clone())
            .or_default()
            .push(order.order_id.clone());
        self.maker_index
            .entry(order.maker.clone())
            .or_default()
            .push(order.order_id.clone());
        self.books.insert(order);
        self.invalidate_snapshot(&order.market_id, order.book_position_id());
    }

    /// Look up an order by id.
    pub fn get_order(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|o| o.clone())
    }

    /// All orders of a market, skipping ids whose bodies are missing.
    pub fn get_market_orders(&self, market_id: &str) -> Vec<Order> {
        self.collect_index(&self.market_index, market_id)
    }

    /// All orders of a maker, skipping ids whose bodies are missing.
    pub fn get_user_orders(&self, maker: &str) -> Vec<Order> {
        self.collect_index(&self.maker_index, maker)
    }

    fn collect_index(&self, index: &DashMap<String, Vec<String>>, key: &str) -> Vec<Order> {
        index
            .get(key)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.orders.get(id).map(|o| o.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fill `fill_size` of an order under its exclusive lock.
    ///
    /// Returns `Ok(false)` without mutating anything when the lock is
    /// contended, the order is unknown or terminal, or the fill size is
    /// invalid; the matching engine treats that as a signal to retry on a
    /// later tick.
    pub async fn fill_order(
        &self,
        order_id: &str,
        fill_size: u64,
        holder: &str,
    ) -> Result<bool, ExchangeError> {
        if !self.locks.try_acquire(order_id, holder) {
            debug!(order = order_id, holder, "fill skipped: lock contended");
            return Ok(false);
        }
        let result = self.fill_order_locked(order_id, fill_size).await;
        self.locks.release(order_id, holder);
        result
    }

    async fn fill_order_locked(
        &self,
        order_id: &str,
        fill_size: u64,
    ) -> Result<bool, ExchangeError> {
        let updated = {
            let mut entry = match self.orders.get_mut(order_id) {
                Some(entry) => entry,
                None => {
                    warn!(order = order_id, "fill skipped: unknown order");
                    return Ok(false);
                }
            };
            let order = entry.value_mut();
            if order.status.is_terminal() {
                debug!(order = order_id, status = %order.status, "fill rejected: terminal");
                return Ok(false);
            }
            if fill_size == 0 || fill_size > order.remaining_size {
                warn!(
                    order = order_id,
                    fill_size,
                    remaining = order.remaining_size,
                    "fill rejected: bad size"
                );
                return Ok(false);
            }
            order.filled_size += fill_size;
            order.remaining_size -= fill_size;
            order.status = if order.remaining_size == 0 {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            order.updated_at = current_time_millis();
            order.clone()
        };

        if updated.remaining_size == 0 {
            self.books.remove(&updated);
        }
        self.invalidate_snapshot(&updated.market_id, updated.book_position_id());
        self.mirror.upsert_order(&updated).await?;
        Ok(true)
    }

    /// Cancel a resting order.
    ///
    /// Returns `Ok(false)` without altering state when the order is already
    /// terminal (a second cancel of the same id) or its lock is contended;
    /// contention is a signal to retry, not an error.
    pub async fn cancel_order(&self, order_id: &str) -> Result<bool, ExchangeError> {
        self.close_order(order_id, OrderStatus::Cancelled).await
    }

    /// Expire a resting order whose expiration height has passed.
    ///
    /// Same return contract as [`Self::cancel_order`]: `Ok(false)` for a
    /// terminal order or a contended lock, retried on the next sweep.
    pub async fn expire_order(&self, order_id: &str) -> Result<bool, ExchangeError> {
        self.close_order(order_id, OrderStatus::Expired).await
    }

    async fn close_order(&self, order_id: &str, to: OrderStatus) -> Result<bool, ExchangeError> {
        let holder = format!("close:{}", Uuid::new_v4());
        if !self.locks.try_acquire(order_id, &holder) {
            debug!(order = order_id, "close skipped: lock contended");
            return Ok(false);
        }
        let result = self.close_order_locked(order_id, to).await;
        self.locks.release(order_id, &holder);
        result
    }

    async fn close_order_locked(
        &self,
        order_id: &str,
        to: OrderStatus,
    ) -> Result<bool, ExchangeError> {
        let updated = {
            let mut entry = self.orders.get_mut(order_id).ok_or_else(|| {
                ExchangeError::NotFound {
                    resource: "order",
                    id: order_id.to_string(),
                }
            })?;
            let order = entry.value_mut();
            if order.status.is_terminal() {
                return Ok(false);
            }
            order.status = to;
            order.updated_at = current_time_millis();
            order.clone()
        };

        self.books.remove(&updated);
        self.invalidate_snapshot(&updated.market_id, updated.book_position_id());
        self.mirror.upsert_order(&updated).await?;
        debug!(order = order_id, status = %to, "order closed");
        Ok(true)
    }

    /// The aggregated book for `(market, position)`: bids high to low, asks
    /// low to high, resting orders only. Served from a short-lived cache
    /// that every write to the book invalidates.
    pub fn get_orderbook(&self, market_id: &str, position_id: Hex32) -> OrderbookView {
        let key = (market_id.to_string(), position_id);
        let now = current_time_millis();
        if let Some(cached) = self.snapshot_cache.get(&key) {
            if now.saturating_sub(cached.at) <= SNAPSHOT_TTL_MS {
                return cached.view.clone();
            }
        }
        let view = self.build_orderbook(market_id, position_id);
        self.snapshot_cache.insert(
            key,
            CachedView {
                at: now,
                view: view.clone(),
            },
        );
        view
    }

    fn build_orderbook(&self, market_id: &str, position_id: Hex32) -> OrderbookView {
        let Some(book) = self.books.get(market_id, position_id) else {
            return OrderbookView::default();
        };

        let mut bids = Vec::new();
        for entry in book.bids.iter().rev() {
            self.push_level(&mut bids, entry.key().price, entry.value());
        }
        let mut asks = Vec::new();
        for entry in book.asks.iter() {
            self.push_level(&mut asks, entry.key().price, entry.value());
        }
        OrderbookView { bids, asks }
    }

    fn push_level(&self, levels: &mut Vec<OrderbookLevel>, price: u64, order_id: &str) {
        let Some(order) = self.orders.get(order_id) else {
            return;
        };
        if !order.status.is_resting() || order.remaining_size == 0 {
            return;
        }
        match levels.last_mut() {
            Some(level) if level.price == price => {
                level.size += order.remaining_size;
                level.order_count += 1;
            }
            _ => levels.push(OrderbookLevel {
                price,
                size: order.remaining_size,
                order_count: 1,
            }),
        }
    }

    /// Reload all markets and all non-terminal orders from the mirror,
    /// re-indexing resting orders into their sorted books. Must complete
    /// before the matching engine starts.
    pub async fn restore_from_persistence(&self) -> Result<(usize, usize), ExchangeError> {
        let markets = self.mirror.load_markets().await?;
        let market_count = markets.len();
        for market in markets {
            self.markets.insert(market.market_id.clone(), market);
        }

        let orders = self.mirror.load_resting_orders().await?;
        let order_count = orders.len();
        for mut order in orders {
            order.seq = self.next_seq();
            self.index_order(&order);
        }
        info!(
            markets = market_count,
            orders = order_count,
            "restored from persistence"
        );
        Ok((market_count, order_count))
    }
}
