use alloy_primitives::aliases::{I24, U160, U24};
use alloy_primitives::{uint, Address, Bytes, I256, U256};
use alloy_sol_types::{SolCall, SolValue};
use serde::{Deserialize, Serialize};

use crate::abi;
use crate::error::MarketError;
use crate::math::to_base_units;
use crate::model::{CallDescriptor, SwapIntent, TokenId};
use crate::ports::AccountSession;

/// Lowest sqrt price the exchange accepts, plus one.
pub const MIN_SQRT_PRICE_LIMIT: U160 = uint!(4295128740_U160);
/// Highest sqrt price the exchange accepts, minus one.
pub const MAX_SQRT_PRICE_LIMIT: U160 = uint!(1461446703485210103287350952256269251341_U160);

fn default_fee() -> u32 {
    3_000
}

fn default_tick_spacing() -> i32 {
    60
}

/// Per-deployment pool parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwapConfig {
    #[serde(default = "default_fee")]
    pub fee: u32,
    #[serde(default = "default_tick_spacing")]
    pub tick_spacing: i32,
    /// Market hook/controller contract that owns the pools.
    #[serde(default)]
    pub hook_address: Address,
    /// Contract exposing the `swap` entry point.
    #[serde(default)]
    pub router_address: Address,
    /// Fixed price limit. When unset the extreme bound for the swap direction
    /// is used, which leaves the trade without slippage protection.
    #[serde(default)]
    pub sqrt_price_limit_x96: Option<U160>,
    #[serde(default)]
    pub take_claims: bool,
    #[serde(default)]
    pub settle_using_burn: bool,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            fee: default_fee(),
            tick_spacing: default_tick_spacing(),
            hook_address: Address::ZERO,
            router_address: Address::ZERO,
            sqrt_price_limit_x96: None,
            take_claims: false,
            settle_using_burn: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolKey {
    pub currency0: Address,
    pub currency1: Address,
    pub fee: U24,
    pub tick_spacing: I24,
    pub hooks: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapParams {
    pub zero_for_one: bool,
    /// Positive input amount in base units. The market hook reads a
    /// positive value as the amount of the input token to pull, so it must
    /// equal `SwapCallParams::amount_in`, which is what gets approved. A
    /// plain pool router would read the same sign as exact output.
    pub amount_specified: I256,
    pub sqrt_price_limit_x96: U160,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementSettings {
    pub take_claims: bool,
    pub settle_using_burn: bool,
}

/// Everything the exchange's `swap` entry point needs. Building it does not
/// submit anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCallParams {
    pub token0: TokenId,
    pub token1: TokenId,
    pub pool_key: PoolKey,
    pub params: SwapParams,
    pub settings: SettlementSettings,
    pub hook_data: Bytes,
    /// Input amount in base units, for allowance checks.
    pub amount_in: U256,
}

impl SwapCallParams {
    pub fn to_call(&self) -> abi::swapCall {
        abi::swapCall {
            key: abi::PoolKey {
                currency0: self.pool_key.currency0,
                currency1: self.pool_key.currency1,
                fee: self.pool_key.fee,
                tickSpacing: self.pool_key.tick_spacing,
                hooks: self.pool_key.hooks,
            },
            params: abi::SwapParams {
                zeroForOne: self.params.zero_for_one,
                amountSpecified: self.params.amount_specified,
                sqrtPriceLimitX96: self.params.sqrt_price_limit_x96,
            },
            testSettings: abi::TestSettings {
                takeClaims: self.settings.take_claims,
                settleUsingBurn: self.settings.settle_using_burn,
            },
            hookData: self.hook_data.clone(),
        }
    }

    pub fn encode_calldata(&self) -> Bytes {
        self.to_call().abi_encode().into()
    }

    pub fn call_descriptor(&self, router: Address) -> CallDescriptor {
        CallDescriptor::new(router, self.encode_calldata(), "swap")
    }
}

/// Canonical pair ordering: the lower identifier under case-insensitive
/// comparison is `token0`.
pub fn sort_tokens<'a>(a: &'a TokenId, b: &'a TokenId) -> (&'a TokenId, &'a TokenId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

pub fn build_swap(
    intent: &SwapIntent,
    cfg: &SwapConfig,
    session: Option<&AccountSession>,
) -> Result<SwapCallParams, MarketError> {
    let amount_in = to_base_units(intent.amount, intent.input_decimals)?;
    if session.is_none() {
        return Err(MarketError::NoSigner);
    }
    if intent.input_token == intent.output_token {
        return Err(MarketError::InvalidToken(format!(
            "input and output are the same token {}",
            intent.input_token
        )));
    }

    let (token0, token1) = sort_tokens(&intent.input_token, &intent.output_token);
    let zero_for_one = intent.input_token == *token0;

    let fee = U24::try_from(cfg.fee)
        .map_err(|err| MarketError::Config(format!("fee {}: {}", cfg.fee, err)))?;
    let tick_spacing = I24::try_from(cfg.tick_spacing).map_err(|err| {
        MarketError::Config(format!("tick spacing {}: {}", cfg.tick_spacing, err))
    })?;
    let amount_specified = I256::try_from(amount_in)
        .map_err(|err| MarketError::InvalidAmount(format!("{}: {}", intent.amount, err)))?;

    let pool_key = PoolKey {
        currency0: token0.to_address()?,
        currency1: token1.to_address()?,
        fee,
        tick_spacing,
        hooks: cfg.hook_address,
    };
    let sqrt_price_limit_x96 = cfg.sqrt_price_limit_x96.unwrap_or(if zero_for_one {
        MIN_SQRT_PRICE_LIMIT
    } else {
        MAX_SQRT_PRICE_LIMIT
    });

    Ok(SwapCallParams {
        token0: token0.clone(),
        token1: token1.clone(),
        pool_key,
        params: SwapParams {
            zero_for_one,
            amount_specified,
            sqrt_price_limit_x96,
        },
        settings: SettlementSettings {
            take_claims: cfg.take_claims,
            settle_using_burn: cfg.settle_using_burn,
        },
        hook_data: intent.recipient.abi_encode().into(),
        amount_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TxReceipt;
    use crate::ports::WalletSigner;
    use alloy_primitives::B256;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    const LOWER: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    const UPPER: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    struct IdleSigner(Address);

    #[async_trait]
    impl WalletSigner for IdleSigner {
        fn address(&self) -> Address {
            self.0
        }

        async fn submit(&self, _call: &CallDescriptor) -> Result<B256, MarketError> {
            Err(MarketError::NoWallet)
        }

        async fn await_confirmation(&self, _tx_hash: B256) -> Result<TxReceipt, MarketError> {
            Err(MarketError::NoWallet)
        }
    }

    fn session() -> AccountSession {
        AccountSession::new(Arc::new(IdleSigner(Address::repeat_byte(0x42))))
    }

    fn cfg() -> SwapConfig {
        SwapConfig {
            hook_address: Address::repeat_byte(0x77),
            router_address: Address::repeat_byte(0x88),
            ..SwapConfig::default()
        }
    }

    fn intent(input: &str, output: &str, amount: i64) -> SwapIntent {
        SwapIntent {
            input_token: TokenId::new(input),
            output_token: TokenId::new(output),
            amount: Decimal::new(amount, 0),
            input_decimals: 6,
            recipient: Address::repeat_byte(0x42),
        }
    }

    #[test]
    fn lower_input_token_swaps_zero_for_one() {
        let s = session();
        let out = build_swap(&intent(LOWER, UPPER, 100), &cfg(), Some(&s)).unwrap();
        assert_eq!(out.token0.as_str(), LOWER);
        assert_eq!(out.token1.as_str(), UPPER);
        assert!(out.params.zero_for_one);
        assert_eq!(out.params.sqrt_price_limit_x96, MIN_SQRT_PRICE_LIMIT);
        assert_eq!(out.amount_in, U256::from(100_000_000u64));
        assert_eq!(
            out.params.amount_specified,
            I256::try_from(100_000_000i64).unwrap()
        );
        assert_eq!(out.pool_key.fee, U24::from(3_000u32));
        assert_eq!(out.pool_key.hooks, Address::repeat_byte(0x77));
    }

    #[test]
    fn reversed_direction_shares_pool_key() {
        let s = session();
        let fwd = build_swap(&intent(LOWER, UPPER, 100), &cfg(), Some(&s)).unwrap();
        let rev = build_swap(&intent(UPPER, LOWER, 100), &cfg(), Some(&s)).unwrap();
        assert_eq!(fwd.token0, rev.token0);
        assert_eq!(fwd.token1, rev.token1);
        assert_eq!(fwd.pool_key, rev.pool_key);
        assert_ne!(fwd.params.zero_for_one, rev.params.zero_for_one);
        assert_eq!(rev.params.sqrt_price_limit_x96, MAX_SQRT_PRICE_LIMIT);
    }

    #[test]
    fn ordering_ignores_case() {
        // Byte-wise 'B' sorts before 'a'; the pool key must not.
        let upper_b = "0xB000000000000000000000000000000000000000";
        let lower_a = "0xa000000000000000000000000000000000000000";
        let s = session();
        let out = build_swap(&intent(upper_b, lower_a, 5), &cfg(), Some(&s)).unwrap();
        assert_eq!(out.token0.as_str(), lower_a);
        assert!(!out.params.zero_for_one);
    }

    #[test]
    fn calldata_is_deterministic() {
        let s = session();
        let a = build_swap(&intent(LOWER, UPPER, 7), &cfg(), Some(&s)).unwrap();
        let b = build_swap(&intent(LOWER, UPPER, 7), &cfg(), Some(&s)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.encode_calldata(), b.encode_calldata());
        assert_eq!(&a.encode_calldata()[..4], &abi::swapCall::SELECTOR);
    }

    #[test]
    fn hook_data_encodes_recipient() {
        let s = session();
        let out = build_swap(&intent(LOWER, UPPER, 1), &cfg(), Some(&s)).unwrap();
        assert_eq!(out.hook_data.len(), 32);
        assert_eq!(&out.hook_data[12..], Address::repeat_byte(0x42).as_slice());
    }

    #[test]
    fn configured_price_limit_overrides_extreme_bound() {
        let s = session();
        let mut c = cfg();
        c.sqrt_price_limit_x96 = Some(U160::from(79_228_162_514u64));
        let out = build_swap(&intent(UPPER, LOWER, 1), &c, Some(&s)).unwrap();
        assert_eq!(out.params.sqrt_price_limit_x96, U160::from(79_228_162_514u64));
    }

    #[test]
    fn rejects_bad_amount_and_missing_session() {
        let s = session();
        assert!(matches!(
            build_swap(&intent(LOWER, UPPER, 0), &cfg(), Some(&s)),
            Err(MarketError::InvalidAmount(_))
        ));
        assert!(matches!(
            build_swap(&intent(LOWER, UPPER, -3), &cfg(), Some(&s)),
            Err(MarketError::InvalidAmount(_))
        ));
        assert_eq!(
            build_swap(&intent(LOWER, UPPER, 10), &cfg(), None),
            Err(MarketError::NoSigner)
        );
    }

    #[test]
    fn rejects_identical_or_malformed_tokens() {
        let s = session();
        let same = intent(LOWER, &LOWER.to_ascii_lowercase(), 1);
        assert!(matches!(
            build_swap(&same, &cfg(), Some(&s)),
            Err(MarketError::InvalidToken(_))
        ));
        assert!(matches!(
            build_swap(&intent("usdc", UPPER, 1), &cfg(), Some(&s)),
            Err(MarketError::InvalidToken(_))
        ));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let c: SwapConfig = serde_json::from_value(serde_json::json!({
            "hook_address": "0x7777777777777777777777777777777777777777",
            "router_address": "0x8888888888888888888888888888888888888888"
        }))
        .unwrap();
        assert_eq!(c.fee, 3_000);
        assert_eq!(c.tick_spacing, 60);
        assert_eq!(c.hook_address, Address::repeat_byte(0x77));
        assert!(c.sqrt_price_limit_x96.is_none());
    }
}
