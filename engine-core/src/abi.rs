//! Contract interfaces consumed by the client.
//!
//! The swap router and ERC-20 shapes are fixed by the exchange. The market's
//! own accessors and lifecycle entry points are addressed by configurable
//! signature strings, so they are encoded through [`selector`] instead of
//! `sol!` bindings.

use alloy_primitives::{keccak256, Bytes, U256};
use alloy_sol_types::sol_data::{Bool, Uint};
use alloy_sol_types::{SolType, SolValue};

use crate::error::MarketError;

alloy_sol_types::sol! {
    struct PoolKey {
        address currency0;
        address currency1;
        uint24 fee;
        int24 tickSpacing;
        address hooks;
    }

    struct SwapParams {
        bool zeroForOne;
        int256 amountSpecified;
        uint160 sqrtPriceLimitX96;
    }

    struct TestSettings {
        bool takeClaims;
        bool settleUsingBurn;
    }

    function swap(PoolKey key, SwapParams params, TestSettings testSettings, bytes hookData)
        external
        payable
        returns (int256 delta);

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256 balance);
        function allowance(address owner, address spender) external view returns (uint256 remaining);
        function approve(address spender, uint256 amount) external returns (bool ok);
    }
}

/// Return shape of the outcome-probabilities accessor.
pub type ProbabilitiesReturn = (Uint<256>, Uint<256>, Uint<256>);

/// Return shape of the market-state accessor.
pub type MarketStateReturn = (Bool, Bool, Bool, Uint<256>, Uint<256>);

/// First four bytes of keccak256 over a canonical signature such as
/// `resolveMarket(uint8)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.trim().as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selector followed by already ABI-encoded arguments.
pub fn encode_with_signature(signature: &str, encoded_args: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(4 + encoded_args.len());
    out.extend_from_slice(&selector(signature));
    out.extend_from_slice(encoded_args);
    out.into()
}

pub fn decode_probabilities(raw: &[u8]) -> Result<(U256, U256, U256), MarketError> {
    ProbabilitiesReturn::abi_decode_params(raw, true)
        .map_err(|err| MarketError::ChainReadFailure(format!("decode probabilities: {}", err)))
}

pub fn decode_market_state(raw: &[u8]) -> Result<(bool, bool, bool, U256, U256), MarketError> {
    MarketStateReturn::abi_decode_params(raw, true)
        .map_err(|err| MarketError::ChainReadFailure(format!("decode market state: {}", err)))
}

pub fn decode_uint(raw: &[u8]) -> Result<U256, MarketError> {
    U256::abi_decode(raw, true)
        .map_err(|err| MarketError::ChainReadFailure(format!("decode uint256: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use alloy_sol_types::SolCall;

    #[test]
    fn selector_matches_known_erc20_signatures() {
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(
            selector("approve(address,uint256)"),
            IERC20::approveCall::SELECTOR
        );
    }

    #[test]
    fn encode_with_signature_prefixes_selector() {
        let args = U256::from(2u64).abi_encode();
        let data = encode_with_signature("resolveMarket(uint8)", &args);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &selector("resolveMarket(uint8)"));
        assert_eq!(data[35], 2);
    }

    #[test]
    fn market_state_round_trips_through_decoder() {
        let encoded = (true, false, false, U256::from(10u64), U256::from(20u64)).abi_encode_params();
        let (open, closed, resolved, start, close) = decode_market_state(&encoded).unwrap();
        assert!(open && !closed && !resolved);
        assert_eq!(start, U256::from(10u64));
        assert_eq!(close, U256::from(20u64));
    }

    #[test]
    fn truncated_return_data_is_a_read_failure() {
        let err = decode_probabilities(&[0u8; 40]).unwrap_err();
        assert!(matches!(err, MarketError::ChainReadFailure(_)));
    }

    #[test]
    fn balance_of_call_encodes_account() {
        let account = Address::repeat_byte(0x11);
        let data = IERC20::balanceOfCall { account }.abi_encode();
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(&data[16..36], account.as_slice());
    }
}
