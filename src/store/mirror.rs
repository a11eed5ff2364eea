//! Durable mirror of markets and orders.
//!
//! The hot store is authoritative between restarts; every accepted order and
//! every state change is written through to this embedded SQL mirror so a
//! boot can rebuild the books before the matching engine starts.

use crate::error::ExchangeError;
use crate::types::{Hex32, Market, Order, OrderStatus, Side};
use rusqlite::{Connection, Row, params};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handle to the mirror database.
#[derive(Clone)]
pub struct Mirror {
    conn: Arc<Mutex<Connection>>,
}

impl Mirror {
    /// Open (and if necessary create) the mirror at `path`.
    pub fn open(path: &str) -> Result<Self, ExchangeError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        conn.pragma_update(None, "foreign_keys", "ON").ok();
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// An in-memory mirror, for tests and ephemeral runs.
    pub fn in_memory() -> Result<Self, ExchangeError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON").ok();
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS markets (
                marketId TEXT PRIMARY KEY,
                conditionId TEXT NOT NULL,
                question TEXT NOT NULL,
                creator TEXT NOT NULL,
                yesPositionId TEXT NOT NULL,
                noPositionId TEXT NOT NULL,
                yesPrice INTEGER NOT NULL,
                noPrice INTEGER NOT NULL,
                volume24h INTEGER NOT NULL,
                createdAt INTEGER NOT NULL,
                resolved INTEGER NOT NULL,
                outcome INTEGER
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS orders (
                orderId TEXT PRIMARY KEY,
                maker TEXT NOT NULL,
                marketId TEXT NOT NULL REFERENCES markets(marketId) ON DELETE CASCADE,
                conditionId TEXT NOT NULL,
                makerPositionId TEXT NOT NULL,
                takerPositionId TEXT NOT NULL,
                side TEXT NOT NULL,
                price INTEGER NOT NULL,
                size INTEGER NOT NULL,
                filledSize INTEGER NOT NULL,
                remainingSize INTEGER NOT NULL,
                status TEXT NOT NULL,
                salt TEXT,
                expiration INTEGER,
                createdAt INTEGER NOT NULL,
                updatedAt INTEGER NOT NULL,
                signature TEXT,
                publicKey TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_orders_market_status
             ON orders(marketId, status)",
            [],
        )?;
        Ok(())
    }

    /// Write or replace a market row.
    pub async fn upsert_market(&self, market: &Market) -> Result<(), ExchangeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO markets
             (marketId, conditionId, question, creator, yesPositionId, noPositionId,
              yesPrice, noPrice, volume24h, createdAt, resolved, outcome)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                market.market_id,
                market.condition_id.to_hex(),
                market.question,
                market.creator,
                market.yes_position_id.to_hex(),
                market.no_position_id.to_hex(),
                market.yes_price as i64,
                market.no_price as i64,
                market.volume_24h as i64,
                market.created_at as i64,
                market.resolved as i64,
                market.outcome,
            ],
        )?;
        Ok(())
    }

    /// Write or replace an order row.
    pub async fn upsert_order(&self, order: &Order) -> Result<(), ExchangeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO orders
             (orderId, maker, marketId, conditionId, makerPositionId, takerPositionId,
              side, price, size, filledSize, remainingSize, status, salt, expiration,
              createdAt, updatedAt, signature, publicKey)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                     ?15, ?16, ?17, ?18)",
            params![
                order.order_id,
                order.maker,
                order.market_id,
                order.condition_id.to_hex(),
                order.maker_position_id.to_hex(),
                order.taker_position_id.to_hex(),
                order.side.to_string(),
                order.price as i64,
                order.size as i64,
                order.filled_size as i64,
                order.remaining_size as i64,
                order.status.to_string(),
                order.salt,
                order.expiration as i64,
                order.created_at as i64,
                order.updated_at as i64,
                order.signature,
                order.public_key,
            ],
        )?;
        Ok(())
    }

    /// All market rows.
    pub async fn load_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT marketId, conditionId, question, creator, yesPositionId, noPositionId,
                    yesPrice, noPrice, volume24h, createdAt, resolved, outcome
             FROM markets",
        )?;
        let rows = stmt.query_map([], market_from_row)?;
        let mut markets = Vec::new();
        for row in rows {
            markets.push(row??);
        }
        Ok(markets)
    }

    /// All non-terminal order rows, oldest first.
    pub async fn load_resting_orders(&self) -> Result<Vec<Order>, ExchangeError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT orderId, maker, marketId, conditionId, makerPositionId, takerPositionId,
                    side, price, size, filledSize, remainingSize, status, salt, expiration,
                    createdAt, updatedAt, signature, publicKey
             FROM orders
             WHERE status IN ('OPEN', 'PARTIALLY_FILLED')
             ORDER BY createdAt ASC",
        )?;
        let rows = stmt.query_map([], order_from_row)?;
        let mut orders = Vec::new();
        for row in rows {
            orders.push(row??);
        }
        Ok(orders)
    }
}

fn parse_hex32(value: String) -> Result<Hex32, ExchangeError> {
    Hex32::from_hex(&value).ok_or_else(|| ExchangeError::Store {
        message: format!("corrupt 32-byte id in mirror: {value:?}"),
    })
}

fn market_from_row(row: &Row<'_>) -> rusqlite::Result<Result<Market, ExchangeError>> {
    let condition_id: String = row.get(1)?;
    let yes_position_id: String = row.get(4)?;
    let no_position_id: String = row.get(5)?;
    let market = (|| {
        Ok(Market {
            market_id: row_string(row, 0)?,
            condition_id: parse_hex32(condition_id)?,
            question: row_string(row, 2)?,
            creator: row_string(row, 3)?,
            yes_position_id: parse_hex32(yes_position_id)?,
            no_position_id: parse_hex32(no_position_id)?,
            yes_price: row_u64(row, 6)?,
            no_price: row_u64(row, 7)?,
            volume_24h: row_u64(row, 8)?,
            created_at: row_u64(row, 9)?,
            resolved: row_u64(row, 10)? != 0,
            outcome: row.get::<_, Option<i64>>(11).map_err(store_err)?.map(|v| v as u8),
        })
    })();
    Ok(market)
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Result<Order, ExchangeError>> {
    let condition_id: String = row.get(3)?;
    let maker_position_id: String = row.get(4)?;
    let taker_position_id: String = row.get(5)?;
    let order = (|| {
        Ok(Order {
            order_id: row_string(row, 0)?,
            maker: row_string(row, 1)?,
            market_id: row_string(row, 2)?,
            condition_id: parse_hex32(condition_id)?,
            maker_position_id: parse_hex32(maker_position_id)?,
            taker_position_id: parse_hex32(taker_position_id)?,
            side: parse_side(&row_string(row, 6)?)?,
            price: row_u64(row, 7)?,
            size: row_u64(row, 8)?,
            filled_size: row_u64(row, 9)?,
            remaining_size: row_u64(row, 10)?,
            status: parse_status(&row_string(row, 11)?)?,
            salt: row
                .get::<_, Option<String>>(12)
                .map_err(store_err)?
                .unwrap_or_default(),
            expiration: row.get::<_, Option<i64>>(13).map_err(store_err)?.unwrap_or(0) as u64,
            created_at: row_u64(row, 14)?,
            updated_at: row_u64(row, 15)?,
            signature: row.get(16).map_err(store_err)?,
            public_key: row.get(17).map_err(store_err)?,
            seq: 0,
        })
    })();
    Ok(order)
}

fn store_err(err: rusqlite::Error) -> ExchangeError {
    ExchangeError::Store {
        message: err.to_string(),
    }
}

fn row_string(row: &Row<'_>, index: usize) -> Result<String, ExchangeError> {
    row.get(index).map_err(store_err)
}

fn row_u64(row: &Row<'_>, index: usize) -> Result<u64, ExchangeError> {
    row.get::<_, i64>(index).map(|v| v.max(0) as u64).map_err(store_err)
}

fn parse_side(value: &str) -> Result<Side, ExchangeError> {
    match value {
        "BUY" => Ok(Side::Buy),
        "SELL" => Ok(Side::Sell),
        other => Err(ExchangeError::Store {
            message: format!("corrupt side in mirror: {other:?}"),
        }),
    }
}

fn parse_status(value: &str) -> Result<OrderStatus, ExchangeError> {
    match value {
        "OPEN" => Ok(OrderStatus::Open),
        "PARTIALLY_FILLED" => Ok(OrderStatus::PartiallyFilled),
        "FILLED" => Ok(OrderStatus::Filled),
        "CANCELLED" => Ok(OrderStatus::Cancelled),
        "EXPIRED" => Ok(OrderStatus::Expired),
        other => Err(ExchangeError::Store {
            message: format!("corrupt status in mirror: {other:?}"),
        }),
    }
}
