use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gate_common::GlobalConfig;
use gate_core::{
    AccountSelector, AppState, AuthProvider, ConcurrencyController, NoopAuth, ProxyEngine,
    UpstreamClient, UpstreamClientConfig, UsageRecorder, WreqUpstreamClient,
};
use gate_storage::{MemoryCounterStore, MemoryStorage, SharedCounterStore, Storage, TenantSnapshot};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let cli = Cli::parse();

    let global = GlobalConfig {
        host: cli.host.clone(),
        port: cli.port,
        proxy: cli.proxy.clone(),
        max_account_switches: cli.max_account_switches,
        ..GlobalConfig::default()
    };

    // Persistent tenant storage is out of scope here (see spec Non-goals);
    // a real deployment swaps this for its own `Storage` impl.
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new(TenantSnapshot::default()));

    let counters: Arc<dyn SharedCounterStore> = match cli.redis_url.as_deref() {
        Some(url) => Arc::new(
            gate_storage::RedisCounterStore::connect(url)
                .await
                .map_err(anyhow::Error::msg)
                .context("connecting to redis")?,
        ),
        None => {
            tracing::warn!("no --redis-url given, using an in-process counter store (single node only)");
            Arc::new(MemoryCounterStore::new())
        }
    };

    let state = Arc::new(
        AppState::bootstrap(counters.clone(), storage.clone(), global)
            .await
            .context("bootstrapping app state")?,
    );

    let upstream_cfg = UpstreamClientConfig::from_global(&state.global.load());
    let state_for_proxy = state.clone();
    let client: Arc<dyn UpstreamClient> = Arc::new(
        WreqUpstreamClient::new_with_proxy_resolver(upstream_cfg, move || {
            state_for_proxy.global.load().proxy.clone()
        })
        .context("building upstream client")?,
    );

    let concurrency = Arc::new(ConcurrencyController::new(counters.clone(), 60));
    let selector = AccountSelector::new(Duration::from_secs(300));
    let usage = UsageRecorder::spawn(storage.clone(), 1024, cli.usage_workers);
    let ping_interval = state.global.load().concurrency_ping_interval;
    let max_account_switches = state.global.load().max_account_switches;

    let engine = Arc::new(ProxyEngine::new(
        state.clone(),
        concurrency,
        selector,
        client,
        usage,
        max_account_switches,
        ping_interval,
    ));

    let auth: Arc<dyn AuthProvider> = Arc::new(NoopAuth);

    let app = gate_router::gateway_router(engine, auth);

    let bind = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!(event = "listening", addr = %bind);
    axum::serve(listener, app).await?;
    Ok(())
}
