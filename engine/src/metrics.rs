use anyhow::Result;
use prometheus::{IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    pub quote_fetch_failures: IntCounter,
    pub polls_succeeded: IntCounter,
    pub polls_failed: IntCounter,
    pub tx_submitted: IntCounter,
    pub tx_confirmed: IntCounter,
    pub tx_failed: IntCounter,
    pub balance_read_failures: IntCounter,
    pub market_open: IntGauge,
}

impl Metrics {
    pub fn new(registry: &Registry) -> Result<Arc<Self>> {
        let quote_fetch_failures = IntCounter::with_opts(Opts::new(
            "quote_fetch_failures",
            "Off-chain odds fetches that failed",
        ))?;
        let polls_succeeded =
            IntCounter::with_opts(Opts::new("polls_succeeded", "Market polls succeeded"))?;
        let polls_failed = IntCounter::with_opts(Opts::new("polls_failed", "Market polls failed"))?;
        let tx_submitted =
            IntCounter::with_opts(Opts::new("tx_submitted", "Transactions submitted"))?;
        let tx_confirmed =
            IntCounter::with_opts(Opts::new("tx_confirmed", "Transactions confirmed"))?;
        let tx_failed = IntCounter::with_opts(Opts::new(
            "tx_failed",
            "Transactions rejected or reverted",
        ))?;
        let balance_read_failures = IntCounter::with_opts(Opts::new(
            "balance_read_failures",
            "Per-token balance reads that failed",
        ))?;
        let market_open = IntGauge::with_opts(Opts::new(
            "market_open",
            "Last polled open flag of the market",
        ))?;
        registry.register(Box::new(quote_fetch_failures.clone())).ok();
        registry.register(Box::new(polls_succeeded.clone())).ok();
        registry.register(Box::new(polls_failed.clone())).ok();
        registry.register(Box::new(tx_submitted.clone())).ok();
        registry.register(Box::new(tx_confirmed.clone())).ok();
        registry.register(Box::new(tx_failed.clone())).ok();
        registry.register(Box::new(balance_read_failures.clone())).ok();
        registry.register(Box::new(market_open.clone())).ok();
        Ok(Arc::new(Self {
            quote_fetch_failures,
            polls_succeeded,
            polls_failed,
            tx_submitted,
            tx_confirmed,
            tx_failed,
            balance_read_failures,
            market_open,
        }))
    }

    /// Unregistered instance for tests and one-shot tools.
    pub fn detached() -> Result<Arc<Self>> {
        Self::new(&Registry::new())
    }
}
