use crate::http_pool::HttpPool;
use alloy_primitives::{hex, Address, Bytes};
use alloy_sol_types::{Revert, SolError};
use async_trait::async_trait;
use engine_core::ChainReader;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc transport: {0:#}")]
    Transport(anyhow::Error),

    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },

    #[error("rpc decode: {0}")]
    Decode(String),
}

impl RpcError {
    /// Human-readable failure reason, including a decoded `Error(string)`
    /// revert payload when the node attaches one.
    pub fn reason(&self) -> String {
        match self {
            RpcError::Rpc { message, data, .. } => {
                let decoded = data
                    .as_deref()
                    .and_then(|d| hex::decode(d.trim_start_matches("0x")).ok())
                    .and_then(|raw| Revert::abi_decode(&raw, true).ok())
                    .map(|r| r.reason);
                match decoded {
                    Some(reason) if !message.contains(&reason) => {
                        format!("{}: {}", message, reason)
                    }
                    _ => message.clone(),
                }
            }
            other => other.to_string(),
        }
    }
}

pub fn parse_hex_u64(s: &str) -> Option<u64> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

/// Minimal Ethereum JSON-RPC client over the shared HTTP pool.
#[derive(Clone)]
pub struct JsonRpcClient {
    pool: Arc<HttpPool>,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub fn new(pool: Arc<HttpPool>, rpc_url: &str) -> Self {
        // websocket endpoints are usually served over http on the same host
        let url = if rpc_url.starts_with("wss://") {
            rpc_url.replacen("wss://", "https://", 1)
        } else if rpc_url.starts_with("ws://") {
            rpc_url.replacen("ws://", "http://", 1)
        } else {
            rpc_url.to_string()
        };
        Self {
            pool,
            url,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let resp = self
            .pool
            .post_json(&self.url, &body)
            .await
            .map_err(RpcError::Transport)?;
        let Some(js) = resp.json else {
            return Err(RpcError::Transport(anyhow::anyhow!(
                "http {}: {}",
                resp.status,
                resp.text.unwrap_or_default()
            )));
        };
        if let Some(err) = js.get("error") {
            return Err(RpcError::Rpc {
                code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
                data: err.get("data").and_then(Value::as_str).map(str::to_string),
            });
        }
        match js.get("result") {
            Some(result) => Ok(result.clone()),
            None => Err(RpcError::Decode(format!(
                "{} response has neither result nor error (http {})",
                method, resp.status
            ))),
        }
    }

    pub async fn eth_call(&self, to: Address, data: &Bytes) -> Result<Bytes, RpcError> {
        let result = self
            .request(
                "eth_call",
                json!([{ "to": to.to_checksum(None), "data": data.to_string() }, "latest"]),
            )
            .await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| RpcError::Decode("eth_call result is not a string".to_string()))?;
        hex::decode(hex_str.trim_start_matches("0x"))
            .map(Bytes::from)
            .map_err(|err| RpcError::Decode(format!("eth_call result: {}", err)))
    }
}

#[async_trait]
impl ChainReader for JsonRpcClient {
    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes> {
        Ok(self.eth_call(to, &data).await?)
    }
}
