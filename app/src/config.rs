use std::{env, path::Path};

use anyhow::{Context, Result};
use engine::config::EngineConfig;
use tokio::fs;
use tracing::info;

const MARKET_RPC_URL: &str = "MARKET_RPC_URL";
const WALLET_RPC_URL: &str = "WALLET_RPC_URL";
const ODDS_URL: &str = "ODDS_URL";

pub async fn load_config(config_path: &Path) -> Result<EngineConfig> {
    let raw = fs::read(config_path)
        .await
        .with_context(|| format!("read config file: {}", config_path.display()))?;
    let mut cfg: EngineConfig = serde_json::from_slice(&raw).context("parse config json")?;
    apply_overrides(&mut cfg, |key| env::var(key).ok());
    info!(
        rpc = %cfg.chain.rpc_url,
        market = %cfg.chain.market_address,
        wallet = cfg.wallet.provider_url.is_some(),
        "loaded config from {}",
        config_path.display()
    );
    Ok(cfg)
}

/// Environment wins over the file. Blank values are ignored.
pub fn apply_overrides(cfg: &mut EngineConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    if let Some(url) = get(MARKET_RPC_URL) {
        cfg.chain.rpc_url = url;
    }
    if let Some(url) = get(WALLET_RPC_URL) {
        cfg.wallet.provider_url = Some(url);
    }
    if let Some(url) = get(ODDS_URL) {
        cfg.odds.url = url;
    }
}
