//! Block-height monitor and order expiration.
//!
//! Polls the chain API for the current tip height on a long period, caches
//! the highest height seen, and on every increase expires resting orders
//! whose expiration height has passed. Poll failures are logged and never
//! move the cached height.

use crate::error::ExchangeError;
use crate::store::OrderStore;
use crossbeam::atomic::AtomicCell;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Height poll period.
pub const POLL_PERIOD: Duration = Duration::from_secs(30);

/// Bounded wait on the height endpoint.
const POLL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct NodeInfo {
    stacks_tip_height: u64,
}

/// Watches the chain tip and expires stale orders.
pub struct BlockHeightMonitor {
    store: Arc<OrderStore>,
    client: reqwest::Client,
    api_url: String,
    cached_height: AtomicCell<u64>,
}

impl BlockHeightMonitor {
    /// Create a monitor polling `api_url`.
    pub fn new(store: Arc<OrderStore>, api_url: &str) -> Self {
        Self {
            store,
            client: reqwest::Client::builder()
                .timeout(POLL_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_url: api_url.trim_end_matches('/').to_string(),
            cached_height: AtomicCell::new(0),
        }
    }

    /// The highest height observed so far.
    pub fn current_height(&self) -> u64 {
        self.cached_height.load()
    }

    /// Run the periodic poller until `shutdown` flips to `true`.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(POLL_PERIOD);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!("block-height monitor started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.poll_once().await {
                        warn!(error = %err, "height poll failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("block-height monitor stopped");
    }

    /// Poll the tip once; on an observed increase, sweep expired orders.
    pub async fn poll_once(&self) -> Result<(), ExchangeError> {
        let url = format!("{}/v2/info", self.api_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangeError::Internal {
                message: format!("height endpoint unreachable: {e}"),
            })?;
        let info: NodeInfo = response.json().await.map_err(|e| ExchangeError::Internal {
            message: format!("height response unreadable: {e}"),
        })?;

        let previous = self.cached_height.load();
        if info.stacks_tip_height > previous {
            self.cached_height.store(info.stacks_tip_height);
            debug!(
                height = info.stacks_tip_height,
                previous, "chain tip advanced"
            );
            expire_below(&self.store, info.stacks_tip_height).await;
        }
        Ok(())
    }
}

/// Expire every resting order in every open market whose expiration height
/// is non-zero and below `height`. Per-order failures are logged and do not
/// stop the sweep.
pub async fn expire_below(store: &OrderStore, height: u64) {
    for market in store.get_all_markets() {
        if market.resolved {
            continue;
        }
        for order in store.get_market_orders(&market.market_id) {
            if !order.status.is_resting() || order.expiration == 0 || order.expiration >= height {
                continue;
            }
            match store.expire_order(&order.order_id).await {
                Ok(true) => {
                    debug!(order = %order.order_id, expiration = order.expiration, height, "order expired")
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(order = %order.order_id, error = %err, "expiration failed")
                }
            }
        }
    }
}
