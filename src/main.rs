use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fairdraw::watcher::LogAlertSink;
use fairdraw::{ChainRpc, Config, Engine, EnvSecret, HttpRpc, JsonFileStore, SecretProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config::from_env().context("loading configuration")?;
    let rpc = pick_endpoint(&cfg.rpc_urls).await?;

    let store = JsonFileStore::new(cfg.store_path.clone());
    let secret = EnvSecret::from_env();
    if secret.reveal().is_none() {
        warn!(
            var = EnvSecret::VAR,
            "no draw secret set; close and pick commands will refuse to run"
        );
    }

    let scan_interval = cfg.scan_interval;
    let watch_interval = cfg.watch_interval;
    let engine = Arc::new(Engine::new(cfg, rpc, store, secret).context("loading document")?);

    let mut scheduler = fairdraw::scheduler::Scheduler::new();
    {
        let engine = engine.clone();
        scheduler.spawn_periodic("ticket-scan", scan_interval, move || {
            let engine = engine.clone();
            async move { engine.scan_tickets().await }
        });
    }
    {
        let engine = engine.clone();
        scheduler.spawn_periodic("pool-watch", watch_interval, move || {
            let engine = engine.clone();
            async move { engine.scan_pool(&LogAlertSink).await }
        });
    }

    info!("fairdraw running; ctrl-c to stop");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutting down");
    scheduler.shutdown().await;
    Ok(())
}

/// Probe the configured endpoints in order and keep the first that answers
async fn pick_endpoint(urls: &[String]) -> anyhow::Result<HttpRpc> {
    for url in urls {
        let rpc = match HttpRpc::new(url.clone()) {
            Ok(rpc) => rpc,
            Err(e) => {
                warn!(url = %url, error = %e, "could not build rpc client");
                continue;
            }
        };
        match rpc.block_number().await {
            Ok(head) => {
                info!(url = %url, head, "rpc endpoint selected");
                return Ok(rpc);
            }
            Err(e) => warn!(url = %url, error = %e, "rpc endpoint failed probe"),
        }
    }
    anyhow::bail!("no rpc endpoint answered; check RPC_URLS")
}
