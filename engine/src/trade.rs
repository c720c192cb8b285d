use crate::balances::BalanceTracker;
use crate::config::{TokenConfig, TokensConfig};
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use engine_core::abi::{decode_uint, IERC20};
use engine_core::{
    build_swap, to_base_units, AccountSession, BalanceSet, CallDescriptor, ChainReader,
    MarketError, Outcome, SwapConfig, SwapIntent, TokenId, TokenSymbol, TxReceipt,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeOutcome {
    /// Present when the router allowance had to be raised first.
    pub approval: Option<TxReceipt>,
    pub swap: TxReceipt,
    pub balances: BalanceSet,
}

/// Buys outcome tokens with the stablecoin through the swap router.
pub struct TradeExecutor {
    reader: Arc<dyn ChainReader>,
    swap_cfg: SwapConfig,
    tokens: TokensConfig,
    balances: Arc<BalanceTracker>,
}

impl TradeExecutor {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        swap_cfg: SwapConfig,
        tokens: TokensConfig,
        balances: Arc<BalanceTracker>,
    ) -> Self {
        Self {
            reader,
            swap_cfg,
            tokens,
            balances,
        }
    }

    fn token(&self, symbol: TokenSymbol) -> Result<TokenConfig, MarketError> {
        self.tokens
            .get(symbol)
            .ok_or_else(|| MarketError::Config(format!("no {} token configured", symbol)))
    }

    async fn allowance(&self, token: Address, owner: Address) -> Result<U256, MarketError> {
        let data = IERC20::allowanceCall {
            owner,
            spender: self.swap_cfg.router_address,
        }
        .abi_encode();
        let raw = self
            .reader
            .call(token, data.into())
            .await
            .map_err(|err| MarketError::ChainReadFailure(format!("allowance: {:#}", err)))?;
        decode_uint(&raw)
    }

    fn approve_call(&self, token: Address, amount: U256) -> CallDescriptor {
        let data = IERC20::approveCall {
            spender: self.swap_cfg.router_address,
            amount,
        }
        .abi_encode();
        CallDescriptor::new(token, data, "approve")
    }

    /// Approves the router to spend `amount` of the stablecoin.
    pub async fn approve(
        &self,
        amount: Decimal,
        session: Option<&AccountSession>,
    ) -> Result<TxReceipt, MarketError> {
        let usdc = self.token(TokenSymbol::Usdc)?;
        let units = to_base_units(amount, usdc.decimals)?;
        let session = session.ok_or(MarketError::NoSigner)?;
        let receipt = session
            .signer
            .sign_and_send(&self.approve_call(usdc.address, units))
            .await?;
        info!(target: "trade", %amount, tx_hash = %receipt.tx_hash, "router approved");
        Ok(receipt)
    }

    /// Stablecoin into the outcome token. The allowance is read fresh and
    /// raised only when short; balances are re-read after the swap lands.
    pub async fn buy(
        &self,
        outcome: Outcome,
        amount: Decimal,
        session: Option<&AccountSession>,
    ) -> Result<TradeOutcome, MarketError> {
        let usdc = self.token(TokenSymbol::Usdc)?;
        let target = self.token(outcome.symbol())?;
        let intent = SwapIntent {
            input_token: TokenId::from(usdc.address),
            output_token: TokenId::from(target.address),
            amount,
            input_decimals: usdc.decimals,
            recipient: session.map(|s| s.address).unwrap_or_default(),
        };
        let swap = build_swap(&intent, &self.swap_cfg, session)?;
        let session = session.ok_or(MarketError::NoSigner)?;

        let allowance = self.allowance(usdc.address, session.address).await?;
        let approval = if allowance < swap.amount_in {
            info!(target: "trade", %allowance, needed = %swap.amount_in, "raising router allowance");
            Some(
                session
                    .signer
                    .sign_and_send(&self.approve_call(usdc.address, swap.amount_in))
                    .await?,
            )
        } else {
            None
        };

        let call = swap.call_descriptor(self.swap_cfg.router_address);
        let receipt = match session.signer.sign_and_send(&call).await {
            Ok(r) => r,
            Err(err) => {
                warn!(target: "trade", %outcome, %amount, %err, "swap failed");
                return Err(err);
            }
        };
        info!(target: "trade", %outcome, %amount, tx_hash = %receipt.tx_hash, "swap confirmed");

        let balances = self.balances.refresh_balances(session.address).await;
        Ok(TradeOutcome {
            approval,
            swap: receipt,
            balances,
        })
    }
}
