use std::sync::Arc;

use pricewatch::{
    api::{AppState, app_router},
    config::AppConfig,
    db::open_repository,
    livecoinwatch::LiveCoinWatchClient,
    logger::init_tracing,
    metrics::counters::Counters,
    poller::{Poller, PollerHandle, PollerSettings},
    prices::store::SnapshotStore,
    reconciler::Reconciler,
    time::MonotonicClock,
};

/// Builds the fetch → reconcile pipeline and starts it in the background.
///
/// The timestamp clock is seeded with the newest persisted `lastUpdated`.
async fn start_poller(
    cfg: &AppConfig,
    store: SnapshotStore,
    counters: Counters,
) -> anyhow::Result<PollerHandle> {
    let client = LiveCoinWatchClient::new(
        cfg.api_url.clone(),
        cfg.api_key.clone(),
        cfg.fetch_timeout,
    )?;

    let latest = store.latest_update().await?;
    if let Some(at) = latest {
        tracing::info!(latest = %at, "resuming from persisted snapshots");
    }

    let reconciler = Arc::new(Reconciler::new(store, cfg.reconcile_mode));

    let poller = Poller::new(
        Arc::new(client),
        reconciler,
        counters,
        PollerSettings::from(cfg),
    )
    .with_clock(MonotonicClock::starting_at(latest));

    Ok(PollerHandle::spawn(Arc::new(poller)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting pricewatch backend...");

    let cfg = AppConfig::from_env()?;
    tracing::info!(config = ?cfg, "configuration loaded");

    let counters = Counters::default();
    let repo = open_repository(&cfg.database_url, &counters).await?;
    let store = SnapshotStore::new(repo);

    let poller = start_poller(&cfg, store.clone(), counters.clone()).await?;

    let router = app_router(AppState { store, counters }, &cfg);
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr).await?;
    tracing::info!("Server running at http://{}", cfg.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let the in-flight cycle finish before the store goes away.
    poller.shutdown().await;

    Ok(())
}
