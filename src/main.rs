//! Exchange server binary: boot, periodic tasks, HTTP, graceful shutdown.

use anyhow::{Context, Result};
use prediction_clob::api::{self, AppState};
use prediction_clob::config::Config;
use prediction_clob::engine::{MatchingEngine, TradeLog};
use prediction_clob::monitor::BlockHeightMonitor;
use prediction_clob::settlement::SettlementBridge;
use prediction_clob::store::{Mirror, OrderStore};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,prediction_clob=debug")),
        )
        .init();

    let config = Config::from_env().context("reading configuration")?;
    info!(network = ?config.network, api = %config.api_url, "starting exchange");

    let mirror = Mirror::open(&config.database_path).context("opening mirror database")?;
    let store = Arc::new(OrderStore::new(mirror));
    // Markets first, then resting orders back into their books; the engine
    // must not start against a partially restored store.
    store
        .restore_from_persistence()
        .await
        .context("restoring from persistence")?;

    let trades = Arc::new(TradeLog::new());
    let settlement = Arc::new(SettlementBridge::from_config(&config));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine = Arc::new(MatchingEngine::new(
        store.clone(),
        trades.clone(),
        settlement.clone(),
    ));
    let engine_task = tokio::spawn(engine.run(shutdown_rx.clone()));

    let monitor = Arc::new(BlockHeightMonitor::new(store.clone(), &config.api_url));
    let monitor_task = tokio::spawn(monitor.run(shutdown_rx));

    let state = AppState {
        store,
        trades,
        settlement,
        admin_api_key: config.admin_api_key.clone(),
    };
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "http listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("http server")?;

    // Stop the tickers and drain in-flight ticks before exit.
    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    let _ = monitor_task.await;
    info!("exchange stopped");
    Ok(())
}
