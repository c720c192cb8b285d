use std::sync::Arc;

use anyhow::{Context, Result};
use app::proxy::{metrics_route, odds_route, OddsProxy, ProxyConfig, API_KEY_ENV};
use engine::{config::EngineConfig, http_pool::HttpPool};
use prometheus::Registry;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warp::Filter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = ProxyConfig::from_env();
    if cfg.api_key.is_none() {
        warn!("{} is not set; every odds request will fail", API_KEY_ENV);
    }
    let port = cfg.port;

    let registry = Arc::new(Registry::new());
    let http_pool = Arc::new(
        HttpPool::new(&EngineConfig::default().http, registry.as_ref())
            .context("create http pool")?,
    );
    let proxy = Arc::new(OddsProxy::new(http_pool, cfg));
    let route = proxy.config().route.clone();

    let routes = odds_route(proxy).or(metrics_route(registry));
    info!("Odds API server running at http://localhost:{}/{}", port, route);
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
    Ok(())
}
