use crate::config::WalletConfig;
use crate::http_pool::HttpPool;
use crate::metrics::Metrics;
use crate::rpc::{parse_hex_u64, JsonRpcClient, RpcError};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use engine_core::{AccountSession, CallDescriptor, MarketError, TxReceipt, WalletSigner};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const METHOD_NOT_FOUND: i64 = -32601;

/// Wallet backed by an EIP-1193 style JSON-RPC provider that holds the key
/// and signs `eth_sendTransaction` requests itself.
pub struct RpcWalletSigner {
    rpc: JsonRpcClient,
    address: Address,
    receipt_poll: Duration,
    metrics: Arc<Metrics>,
}

impl RpcWalletSigner {
    pub fn new(
        rpc: JsonRpcClient,
        address: Address,
        receipt_poll: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            rpc,
            address,
            receipt_poll,
            metrics,
        }
    }

    async fn request_accounts(rpc: &JsonRpcClient) -> Result<Value, MarketError> {
        match rpc.request("eth_requestAccounts", json!([])).await {
            Ok(v) => Ok(v),
            Err(RpcError::Rpc { code, .. }) if code == METHOD_NOT_FOUND => rpc
                .request("eth_accounts", json!([]))
                .await
                .map_err(|err| connect_error(&err)),
            Err(err) => Err(connect_error(&err)),
        }
    }

    fn parse_receipt(&self, tx_hash: B256, receipt: &Value) -> Result<TxReceipt, MarketError> {
        let block_number = receipt
            .get("blockNumber")
            .and_then(Value::as_str)
            .and_then(parse_hex_u64);
        match receipt.get("status").and_then(Value::as_str) {
            Some(status) if parse_hex_u64(status) == Some(0) => {
                Err(MarketError::rejected("transaction reverted on-chain"))
            }
            _ => Ok(TxReceipt {
                tx_hash,
                block_number,
            }),
        }
    }
}

fn connect_error(err: &RpcError) -> MarketError {
    match err {
        // provider unreachable: treat as not installed
        RpcError::Transport(_) => MarketError::NoWallet,
        other => MarketError::rejected(other.reason()),
    }
}

/// Connects to the configured provider and opens a session for its first
/// account.
pub async fn connect_wallet(
    cfg: &WalletConfig,
    pool: Arc<HttpPool>,
    metrics: Arc<Metrics>,
) -> Result<AccountSession, MarketError> {
    let url = cfg
        .provider_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or(MarketError::NoWallet)?;
    let rpc = JsonRpcClient::new(pool, url);
    let accounts = RpcWalletSigner::request_accounts(&rpc).await?;
    let address = accounts
        .as_array()
        .and_then(|a| a.first())
        .and_then(Value::as_str)
        .and_then(|s| Address::from_str(s).ok())
        .ok_or(MarketError::NoWallet)?;
    info!(target: "wallet", %address, "wallet connected");
    let signer = RpcWalletSigner::new(
        rpc,
        address,
        Duration::from_millis(cfg.receipt_poll_ms.max(1)),
        metrics,
    );
    Ok(AccountSession::new(Arc::new(signer)))
}

#[async_trait]
impl WalletSigner for RpcWalletSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn submit(&self, call: &CallDescriptor) -> Result<B256, MarketError> {
        let tx = json!({
            "from": self.address.to_checksum(None),
            "to": call.to.to_checksum(None),
            "data": call.data.to_string(),
            "value": format!("{:#x}", call.value),
        });
        let result = match self.rpc.request("eth_sendTransaction", json!([tx])).await {
            Ok(v) => v,
            Err(err) => {
                self.metrics.tx_failed.inc();
                return Err(MarketError::rejected(err.reason()));
            }
        };
        let tx_hash = result
            .as_str()
            .and_then(|s| B256::from_str(s).ok())
            .ok_or_else(|| {
                self.metrics.tx_failed.inc();
                MarketError::rejected(format!("provider returned no transaction hash: {}", result))
            })?;
        self.metrics.tx_submitted.inc();
        info!(target: "wallet", action = %call.label, %tx_hash, "transaction submitted");
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: B256) -> Result<TxReceipt, MarketError> {
        let mut ticker = tokio::time::interval(self.receipt_poll);
        loop {
            ticker.tick().await;
            match self
                .rpc
                .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
                .await
            {
                Ok(Value::Null) => {
                    debug!(target: "wallet", %tx_hash, "receipt pending");
                }
                Ok(receipt) => {
                    let parsed = self.parse_receipt(tx_hash, &receipt);
                    match &parsed {
                        Ok(r) => {
                            self.metrics.tx_confirmed.inc();
                            info!(target: "wallet", %tx_hash, block = ?r.block_number, "transaction confirmed");
                        }
                        Err(err) => {
                            self.metrics.tx_failed.inc();
                            warn!(target: "wallet", %tx_hash, %err, "transaction failed");
                        }
                    }
                    return parsed;
                }
                Err(err) => {
                    // the transaction may still land; keep polling
                    warn!(target: "wallet", %tx_hash, %err, "receipt lookup failed");
                }
            }
        }
    }
}
