use crate::http_pool::HttpPool;
use crate::metrics::Metrics;
use async_trait::async_trait;
use engine_core::{MarketError, OutcomeQuote, Price, QuoteSource};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

const DRAW_OUTCOME: &str = "Draw";

#[derive(Debug, Deserialize)]
struct OddsMatch {
    home_team: String,
    away_team: String,
    bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Deserialize)]
struct Bookmaker {
    markets: Vec<OddsMarket>,
}

#[derive(Debug, Deserialize)]
struct OddsMarket {
    outcomes: Vec<OddsOutcome>,
}

#[derive(Debug, Deserialize)]
struct OddsOutcome {
    name: String,
    #[serde(default)]
    price: Value,
}

fn unavailable(reason: impl Into<String>) -> MarketError {
    MarketError::QuoteUnavailable(reason.into())
}

fn price_of(value: &Value) -> Price {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Price::Unavailable,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Price::from_decimal)
        .unwrap_or(Price::Unavailable)
}

/// Picks the home/draw/away prices out of the first match of the first
/// bookmaker's first market. An outcome missing from that list leaves only
/// its own field unavailable.
pub fn parse_quote(body: &Value) -> Result<OutcomeQuote, MarketError> {
    let first = body
        .as_array()
        .ok_or_else(|| unavailable("response is not an array"))?
        .first()
        .ok_or_else(|| unavailable("no matches in response"))?;
    let m: OddsMatch = serde_json::from_value(first.clone())
        .map_err(|err| unavailable(format!("malformed match: {}", err)))?;
    let outcomes = &m
        .bookmakers
        .first()
        .ok_or_else(|| unavailable("match has no bookmakers"))?
        .markets
        .first()
        .ok_or_else(|| unavailable("bookmaker has no markets"))?
        .outcomes;
    let find = |name: &str| {
        outcomes
            .iter()
            .find(|o| o.name == name)
            .map(|o| price_of(&o.price))
            .unwrap_or(Price::Unavailable)
    };
    Ok(OutcomeQuote {
        win: find(&m.home_team),
        draw: find(DRAW_OUTCOME),
        lose: find(&m.away_team),
    })
}

/// One-shot reader of the odds proxy.
pub struct QuoteSourceAdapter {
    pool: Arc<HttpPool>,
    url: String,
    metrics: Arc<Metrics>,
}

impl QuoteSourceAdapter {
    pub fn new(pool: Arc<HttpPool>, url: impl Into<String>, metrics: Arc<Metrics>) -> Self {
        Self {
            pool,
            url: url.into(),
            metrics,
        }
    }

    /// Never fails: any problem degrades to an all-unavailable quote.
    pub async fn fetch_off_chain_quote(&self) -> OutcomeQuote {
        self.try_fetch()
            .await
            .unwrap_or_else(|_| OutcomeQuote::unavailable())
    }

    async fn fetch_inner(&self) -> Result<OutcomeQuote, MarketError> {
        let resp = self
            .pool
            .get(&self.url)
            .await
            .map_err(|err| unavailable(format!("{:#}", err)))?;
        if !resp.is_success() {
            return Err(unavailable(format!("odds endpoint returned {}", resp.status)));
        }
        let body = resp
            .json
            .ok_or_else(|| unavailable("odds endpoint returned invalid json"))?;
        parse_quote(&body)
    }
}

#[async_trait]
impl QuoteSource for QuoteSourceAdapter {
    async fn try_fetch(&self) -> Result<OutcomeQuote, MarketError> {
        match self.fetch_inner().await {
            Ok(quote) => {
                info!(target: "odds", url = %self.url, %quote, "off-chain odds fetched");
                Ok(quote)
            }
            Err(err) => {
                self.metrics.quote_fetch_failures.inc();
                warn!(target: "odds", url = %self.url, %err, "failed to fetch odds");
                Err(err)
            }
        }
    }
}
