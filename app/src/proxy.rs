use std::convert::Infallible;
use std::env;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use engine::http_pool::HttpPool;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};
use url::Url;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

pub const API_KEY_ENV: &str = "ODDS_API_KEY";
const PORT_ENV: &str = "PROXY_PORT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub upstream_base: String,
    pub sport_key: String,
    pub regions: String,
    pub markets: String,
    pub odds_format: String,
    /// Matches are kept when this team plays home or away.
    pub team: String,
    pub route: String,
    pub port: u16,
    /// Never serialized back to clients.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_base: "https://api.the-odds-api.com".to_string(),
            sport_key: "soccer_germany_bundesliga".to_string(),
            regions: "eu".to_string(),
            markets: "h2h".to_string(),
            odds_format: "decimal".to_string(),
            team: "Borussia Dortmund".to_string(),
            route: "dortmund-odds".to_string(),
            port: 3000,
            api_key: None,
        }
    }
}

impl ProxyConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.api_key = env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        if let Some(port) = env::var(PORT_ENV).ok().and_then(|p| p.parse().ok()) {
            cfg.port = port;
        }
        cfg
    }
}

/// Server-side relay to the odds provider, so the key never reaches a
/// client.
pub struct OddsProxy {
    pool: Arc<HttpPool>,
    cfg: ProxyConfig,
}

impl OddsProxy {
    pub fn new(pool: Arc<HttpPool>, cfg: ProxyConfig) -> Self {
        Self { pool, cfg }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.cfg
    }

    fn upstream_url(&self) -> Result<Url> {
        let api_key = self
            .cfg
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("{} is not set", API_KEY_ENV))?;
        let base = format!(
            "{}/v4/sports/{}/odds",
            self.cfg.upstream_base.trim_end_matches('/'),
            self.cfg.sport_key
        );
        Url::parse_with_params(
            &base,
            &[
                ("apiKey", api_key),
                ("regions", self.cfg.regions.as_str()),
                ("markets", self.cfg.markets.as_str()),
                ("oddsFormat", self.cfg.odds_format.as_str()),
            ],
        )
        .with_context(|| format!("build upstream url from '{}'", base))
    }

    /// Upstream matches involving the configured team, in upstream order.
    pub async fn fetch_team_odds(&self) -> Result<Vec<Value>> {
        let url = self.upstream_url()?;
        let resp = self.pool.get(url.as_str()).await.context("upstream request")?;
        if !resp.is_success() {
            bail!("upstream returned {}", resp.status);
        }
        let Some(Value::Array(matches)) = resp.json else {
            bail!("upstream body is not a json array");
        };
        let team = self.cfg.team.as_str();
        let plays = |m: &Value, side: &str| m.get(side).and_then(Value::as_str) == Some(team);
        Ok(matches
            .into_iter()
            .filter(|m| plays(m, "home_team") || plays(m, "away_team"))
            .collect())
    }
}

async fn handle_odds(proxy: Arc<OddsProxy>) -> Result<Response, Infallible> {
    info!(target: "proxy", route = %proxy.cfg.route, "odds requested");
    match proxy.fetch_team_odds().await {
        Ok(matches) => {
            info!(target: "proxy", count = matches.len(), "odds relayed");
            Ok(warp::reply::json(&matches).into_response())
        }
        Err(err) => {
            error!(target: "proxy", "error fetching odds: {:#}", err);
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({ "error": "Failed to fetch odds" })),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response())
        }
    }
}

pub fn odds_route(
    proxy: Arc<OddsProxy>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let route = proxy.cfg.route.clone();
    warp::get()
        .and(warp::path(route))
        .and(warp::path::end())
        .and(warp::any().map(move || proxy.clone()))
        .and_then(handle_odds)
}

fn render_metrics(registry: &Registry) -> Response {
    let mut buffer = Vec::new();
    match TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        Ok(()) => warp::reply::with_header(
            String::from_utf8_lossy(&buffer).into_owned(),
            "content-type",
            "text/plain; version=0.0.4",
        )
        .into_response(),
        Err(err) => {
            error!(target: "proxy", %err, "encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn metrics_route(
    registry: Arc<Registry>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::get()
        .and(warp::path!("metrics"))
        .map(move || render_metrics(&registry))
}
