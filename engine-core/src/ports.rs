use crate::error::MarketError;
use crate::model::*;
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Read-only contract access (`eth_call`).
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes>;
}

/// Wallet capability: any provider that can report its account and get a
/// call signed, broadcast and confirmed.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Signs and broadcasts; returns once the transaction hash is known.
    async fn submit(&self, call: &CallDescriptor) -> Result<B256, MarketError>;

    /// Waits until the transaction is mined. A reverted receipt is an error.
    async fn await_confirmation(&self, tx_hash: B256) -> Result<TxReceipt, MarketError>;

    async fn sign_and_send(&self, call: &CallDescriptor) -> Result<TxReceipt, MarketError> {
        let tx_hash = self.submit(call).await?;
        self.await_confirmation(tx_hash).await
    }
}

/// Off-chain odds snapshot.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn try_fetch(&self) -> Result<OutcomeQuote, MarketError>;
}

/// On-chain odds and lifecycle snapshot.
#[async_trait]
pub trait MarketStateSource: Send + Sync {
    async fn poll_market_state(&self) -> Result<(OutcomeQuote, MarketStatus), MarketError>;
}

/// A connected account. Lives for one connection and is never persisted.
#[derive(Clone)]
pub struct AccountSession {
    pub address: Address,
    pub signer: Arc<dyn WalletSigner>,
}

impl AccountSession {
    pub fn new(signer: Arc<dyn WalletSigner>) -> Self {
        Self {
            address: signer.address(),
            signer,
        }
    }
}

impl fmt::Debug for AccountSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSession")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Notice {
    Info(String),
    Confirmed { action: String, receipt: TxReceipt },
    Failed { action: String, error: MarketError },
}

/// Presentation of action outcomes, kept apart from the actions themselves.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
