use crate::config::LifecycleConfig;
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolValue;
use engine_core::abi::encode_with_signature;
use engine_core::{AccountSession, CallDescriptor, MarketError, Outcome, TxReceipt};
use tracing::{info, warn};

/// Privileged market administration. Each call is sent once; the contract
/// is the only judge of whether it is allowed.
pub struct LifecycleController {
    market: Address,
    cfg: LifecycleConfig,
}

impl LifecycleController {
    pub fn new(market: Address, cfg: LifecycleConfig) -> Self {
        Self { market, cfg }
    }

    pub fn open_call(&self, start: u64, end: u64) -> CallDescriptor {
        let args = (U256::from(start), U256::from(end)).abi_encode_params();
        CallDescriptor::new(self.market, encode_with_signature(&self.cfg.open, &args), "open market")
    }

    pub fn close_call(&self) -> CallDescriptor {
        CallDescriptor::new(self.market, encode_with_signature(&self.cfg.close, &[]), "close market")
    }

    pub fn reset_call(&self) -> CallDescriptor {
        CallDescriptor::new(self.market, encode_with_signature(&self.cfg.reset, &[]), "reset market")
    }

    pub fn resolve_call(&self, outcome: Outcome) -> CallDescriptor {
        let args = U256::from(outcome.index()).abi_encode();
        CallDescriptor::new(
            self.market,
            encode_with_signature(&self.cfg.resolve, &args),
            format!("resolve market ({})", outcome),
        )
    }

    async fn send(
        &self,
        call: CallDescriptor,
        session: Option<&AccountSession>,
    ) -> Result<TxReceipt, MarketError> {
        let session = session.ok_or(MarketError::NoSigner)?;
        match session.signer.sign_and_send(&call).await {
            Ok(receipt) => {
                info!(target: "lifecycle", action = %call.label, tx_hash = %receipt.tx_hash, "confirmed");
                Ok(receipt)
            }
            Err(err) => {
                warn!(target: "lifecycle", action = %call.label, %err, "failed");
                Err(err)
            }
        }
    }

    pub async fn open(
        &self,
        start: u64,
        end: u64,
        session: Option<&AccountSession>,
    ) -> Result<TxReceipt, MarketError> {
        self.send(self.open_call(start, end), session).await
    }

    pub async fn close(&self, session: Option<&AccountSession>) -> Result<TxReceipt, MarketError> {
        self.send(self.close_call(), session).await
    }

    pub async fn reset(&self, session: Option<&AccountSession>) -> Result<TxReceipt, MarketError> {
        self.send(self.reset_call(), session).await
    }

    pub async fn resolve(
        &self,
        outcome: Outcome,
        session: Option<&AccountSession>,
    ) -> Result<TxReceipt, MarketError> {
        self.send(self.resolve_call(outcome), session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::http_pool::HttpPool;
    use crate::metrics::Metrics;
    use crate::rpc::JsonRpcClient;
    use crate::view::MarketView;
    use crate::wallet::RpcWalletSigner;
    use alloy_primitives::hex;
    use alloy_sol_types::{Revert, SolError};
    use engine_core::abi::selector;
    use engine_core::MarketStatus;
    use prometheus::Registry;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn controller() -> LifecycleController {
        LifecycleController::new(Address::repeat_byte(0x55), LifecycleConfig::default())
    }

    #[test]
    fn calldata_uses_configured_signatures() {
        let c = controller();
        let open = c.open_call(100, 200);
        assert_eq!(open.to, Address::repeat_byte(0x55));
        assert_eq!(&open.data[..4], selector("openMarket(uint256,uint256)").as_slice());
        assert_eq!(open.data.len(), 4 + 64);
        assert_eq!(open.data[4 + 31], 100);
        assert_eq!(open.data[4 + 63], 200);

        let resolve = c.resolve_call(Outcome::Lose);
        assert_eq!(&resolve.data[..4], selector("resolveMarket(uint8)").as_slice());
        assert_eq!(resolve.data[4 + 31], 2);
        assert_eq!(c.close_call().data.len(), 4);

        let renamed = LifecycleController::new(
            Address::ZERO,
            LifecycleConfig {
                close: "endMarket()".to_string(),
                ..LifecycleConfig::default()
            },
        );
        assert_eq!(&renamed.close_call().data[..4], selector("endMarket()").as_slice());
    }

    #[tokio::test]
    async fn missing_session_is_no_signer() {
        assert_eq!(controller().close(None).await.unwrap_err(), MarketError::NoSigner);
    }

    #[tokio::test]
    async fn reverting_resolve_carries_reason_and_leaves_view_alone() {
        let revert = Revert {
            reason: "Market not closed".to_string(),
        }
        .abi_encode();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_sendTransaction" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": { "code": 3, "message": "execution reverted", "data": hex::encode_prefixed(revert) }
            })))
            .mount(&server)
            .await;

        let cfg = HttpConfig {
            timeout_ms: 5_000,
            max_connections: 2,
        };
        let pool = Arc::new(HttpPool::new(&cfg, &Registry::new()).unwrap());
        let signer = RpcWalletSigner::new(
            JsonRpcClient::new(pool, &server.uri()),
            Address::repeat_byte(0x42),
            Duration::from_millis(10),
            Metrics::detached().unwrap(),
        );
        let session = AccountSession::new(Arc::new(signer));

        let view = MarketView::new();
        let status = MarketStatus {
            is_open: true,
            ..MarketStatus::default()
        };
        view.apply_market_poll(Ok((engine_core::OutcomeQuote::unavailable(), status)));
        let before = view.snapshot();

        let err = controller()
            .resolve(Outcome::Win, Some(&session))
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::rejected("execution reverted: Market not closed"));
        assert_eq!(view.snapshot(), before);
    }
}
