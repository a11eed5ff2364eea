//! The continuous matching engine.
//!
//! A single periodic driver clears crossing orders per market and per
//! outcome with price-time priority. A tick that is still running when the
//! next one fires makes the next tick skip entirely; a failure in one book
//! never prevents the other books from running in the same tick.

mod matching;
mod trades;

pub use trades::{OhlcBucket, TradeLog};

use crate::settlement::SettlementBridge;
use crate::store::OrderStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, trace, warn};

/// Matching tick period.
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// The periodic matching driver.
pub struct MatchingEngine {
    pub(crate) store: Arc<OrderStore>,
    pub(crate) trades: Arc<TradeLog>,
    pub(crate) settlement: Arc<SettlementBridge>,
    in_progress: AtomicBool,
}

impl MatchingEngine {
    /// Create an engine over the shared store, trade log, and bridge.
    pub fn new(
        store: Arc<OrderStore>,
        trades: Arc<TradeLog>,
        settlement: Arc<SettlementBridge>,
    ) -> Self {
        Self {
            store,
            trades,
            settlement,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Run the periodic driver until `shutdown` flips to `true`. The
    /// in-flight tick is drained before returning.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(TICK_PERIOD);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!("matching engine started");
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("matching engine stopped");
    }

    /// Run one matching pass over every open market and both of its outcome
    /// books. Re-entrant calls return immediately.
    pub async fn tick(&self) {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            trace!("previous tick still in progress, skipping");
            return;
        }
        for market in self.store.get_all_markets() {
            if market.resolved {
                continue;
            }
            for position_id in [market.yes_position_id, market.no_position_id] {
                if let Err(err) = self.match_book(&market.market_id, position_id).await {
                    warn!(
                        market = %market.market_id,
                        position = %position_id,
                        error = %err,
                        "book left for next tick"
                    );
                }
            }
        }
        self.in_progress.store(false, Ordering::Release);
    }
}
