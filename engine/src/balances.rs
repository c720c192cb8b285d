use crate::config::TokensConfig;
use crate::metrics::Metrics;
use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use engine_core::abi::{decode_uint, IERC20};
use engine_core::{from_base_units, Balance, BalanceSet, ChainReader, MarketError, TokenSymbol};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedToken {
    pub symbol: TokenSymbol,
    pub address: Address,
    pub decimals: u32,
}

/// Reads the connected account's stablecoin and outcome-token balances.
pub struct BalanceTracker {
    reader: Arc<dyn ChainReader>,
    tokens: Vec<TrackedToken>,
    metrics: Arc<Metrics>,
}

impl BalanceTracker {
    pub fn new(reader: Arc<dyn ChainReader>, tokens: &TokensConfig, metrics: Arc<Metrics>) -> Self {
        let tokens = tokens
            .tracked()
            .into_iter()
            .map(|(symbol, t)| TrackedToken {
                symbol,
                address: t.address,
                decimals: t.decimals,
            })
            .collect();
        Self {
            reader,
            tokens,
            metrics,
        }
    }

    pub fn tokens(&self) -> &[TrackedToken] {
        &self.tokens
    }

    pub async fn balance_of(
        &self,
        token: &TrackedToken,
        account: Address,
    ) -> Result<Balance, MarketError> {
        let data = IERC20::balanceOfCall { account }.abi_encode();
        let raw = self
            .reader
            .call(token.address, data.into())
            .await
            .map_err(|err| {
                MarketError::ChainReadFailure(format!("{} balanceOf: {:#}", token.symbol, err))
            })?;
        let units = decode_uint(&raw)?;
        from_base_units(units, token.decimals)
            .map(Balance::Available)
            .ok_or_else(|| {
                MarketError::ChainReadFailure(format!("{} balance {} out of range", token.symbol, units))
            })
    }

    /// One independent read per token; a failed read blanks only its own
    /// symbol.
    pub async fn refresh_balances(&self, account: Address) -> BalanceSet {
        let reads = self.tokens.iter().map(|token| async move {
            let balance = match self.balance_of(token, account).await {
                Ok(b) => b,
                Err(err) => {
                    self.metrics.balance_read_failures.inc();
                    warn!(target: "chain", symbol = %token.symbol, %err, "balance read failed");
                    Balance::Unavailable
                }
            };
            (token.symbol, balance)
        });
        let balances = join_all(reads).await.into_iter().collect();
        debug!(target: "chain", %account, ?balances, "balances refreshed");
        BalanceSet { account, balances }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use alloy_primitives::{Bytes, U256};
    use alloy_sol_types::SolValue;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    /// Balance per token contract; missing contracts revert.
    struct FakeErc20s(HashMap<Address, U256>);

    #[async_trait]
    impl ChainReader for FakeErc20s {
        async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes> {
            assert_eq!(&data[..4], IERC20::balanceOfCall::SELECTOR.as_slice());
            self.0
                .get(&to)
                .map(|v| Bytes::from(v.abi_encode()))
                .ok_or_else(|| anyhow::anyhow!("execution reverted"))
        }
    }

    fn tokens() -> TokensConfig {
        let t = |b: u8, decimals: u32| {
            Some(TokenConfig {
                address: Address::repeat_byte(b),
                decimals,
            })
        };
        TokensConfig {
            usdc: t(1, 6),
            win: t(2, 18),
            draw: t(3, 18),
            lose: t(4, 18),
        }
    }

    #[tokio::test]
    async fn failed_read_only_blanks_that_symbol() {
        let chain = FakeErc20s(HashMap::from([
            (Address::repeat_byte(1), U256::from(125_500_000u64)),
            (Address::repeat_byte(2), U256::from(10u64).pow(U256::from(18u64))),
            (Address::repeat_byte(4), U256::ZERO),
        ]));
        let metrics = Metrics::detached().unwrap();
        let tracker = BalanceTracker::new(Arc::new(chain), &tokens(), metrics.clone());
        let set = tracker.refresh_balances(Address::repeat_byte(9)).await;

        assert_eq!(set.account, Address::repeat_byte(9));
        assert_eq!(set.get(TokenSymbol::Usdc), Some(Balance::Available(Decimal::new(1255, 1))));
        assert_eq!(set.get(TokenSymbol::Win), Some(Balance::Available(Decimal::ONE)));
        assert_eq!(set.get(TokenSymbol::Draw), Some(Balance::Unavailable));
        assert_eq!(set.get(TokenSymbol::Lose), Some(Balance::Available(Decimal::ZERO)));
        assert_eq!(metrics.balance_read_failures.get(), 1);
    }

    #[tokio::test]
    async fn unconfigured_tokens_are_skipped() {
        let cfg = TokensConfig {
            usdc: tokens().usdc,
            ..TokensConfig::default()
        };
        let chain = FakeErc20s(HashMap::from([(Address::repeat_byte(1), U256::from(7u64))]));
        let tracker = BalanceTracker::new(Arc::new(chain), &cfg, Metrics::detached().unwrap());
        let set = tracker.refresh_balances(Address::ZERO).await;
        assert_eq!(set.balances.len(), 1);
        assert_eq!(
            set.get(TokenSymbol::Usdc),
            Some(Balance::Available(Decimal::new(7, 6)))
        );
    }
}
