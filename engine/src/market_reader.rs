use crate::config::ChainConfig;
use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use engine_core::abi::{decode_market_state, decode_probabilities, encode_with_signature};
use engine_core::{
    odds_from_probabilities, ChainReader, MarketError, MarketStateSource, MarketStatus,
    OutcomeQuote,
};
use std::sync::Arc;

/// Reads implied odds and the lifecycle tuple from the market contract.
pub struct MarketStateReader {
    reader: Arc<dyn ChainReader>,
    market: Address,
    probabilities_call: Bytes,
    state_call: Bytes,
    scale: U256,
}

fn saturating_secs(v: U256) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

impl MarketStateReader {
    pub fn new(reader: Arc<dyn ChainReader>, cfg: &ChainConfig) -> Self {
        Self {
            reader,
            market: cfg.market_address,
            probabilities_call: encode_with_signature(&cfg.probabilities_accessor, &[]),
            state_call: encode_with_signature(&cfg.state_accessor, &[]),
            scale: cfg.probability_scale,
        }
    }

    async fn read(&self, data: &Bytes, what: &str) -> Result<Bytes, MarketError> {
        self.reader
            .call(self.market, data.clone())
            .await
            .map_err(|err| MarketError::ChainReadFailure(format!("{}: {:#}", what, err)))
    }

    pub async fn read_odds(&self) -> Result<OutcomeQuote, MarketError> {
        let raw = self.read(&self.probabilities_call, "probabilities").await?;
        let (win, draw, lose) = decode_probabilities(&raw)?;
        Ok(odds_from_probabilities(win, draw, lose, self.scale))
    }

    pub async fn read_status(&self) -> Result<MarketStatus, MarketError> {
        let raw = self.read(&self.state_call, "market state").await?;
        let (is_open, is_closed, is_resolved, start, close) = decode_market_state(&raw)?;
        Ok(MarketStatus {
            is_open,
            is_closed,
            is_resolved,
            start_time: saturating_secs(start),
            close_time: saturating_secs(close),
        })
    }
}

#[async_trait]
impl MarketStateSource for MarketStateReader {
    async fn poll_market_state(&self) -> Result<(OutcomeQuote, MarketStatus), MarketError> {
        let (quote, status) = futures::try_join!(self.read_odds(), self.read_status())?;
        Ok((quote, status))
    }
}
