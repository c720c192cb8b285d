use alloy_primitives::{Address, U256};
use engine_core::{SwapConfig, TokenSymbol};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub max_connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsSourceConfig {
    /// Proxy endpoint returning the provider's match array.
    pub url: String,
}

fn default_probabilities_accessor() -> String {
    "getOutcomeProbabilities()".to_string()
}

fn default_state_accessor() -> String {
    "getMarketState()".to_string()
}

fn default_probability_scale() -> U256 {
    U256::from(1_000_000_000_000_000_000u128)
}

fn default_poll_interval_ms() -> u64 {
    15_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    /// Hook/controller contract holding market state.
    pub market_address: Address,
    #[serde(default = "default_probabilities_accessor")]
    pub probabilities_accessor: String,
    #[serde(default = "default_state_accessor")]
    pub state_accessor: String,
    /// Fixed-point unit of the probability values.
    #[serde(default = "default_probability_scale")]
    pub probability_scale: U256,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenConfig {
    pub address: Address,
    pub decimals: u32,
}

/// Tracked tokens. Entries left out of a deployment are skipped everywhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokensConfig {
    #[serde(default)]
    pub usdc: Option<TokenConfig>,
    #[serde(default)]
    pub win: Option<TokenConfig>,
    #[serde(default)]
    pub draw: Option<TokenConfig>,
    #[serde(default)]
    pub lose: Option<TokenConfig>,
}

impl TokensConfig {
    pub fn get(&self, symbol: TokenSymbol) -> Option<TokenConfig> {
        match symbol {
            TokenSymbol::Usdc => self.usdc,
            TokenSymbol::Win => self.win,
            TokenSymbol::Draw => self.draw,
            TokenSymbol::Lose => self.lose,
        }
    }

    pub fn tracked(&self) -> Vec<(TokenSymbol, TokenConfig)> {
        TokenSymbol::ALL
            .iter()
            .filter_map(|s| self.get(*s).map(|t| (*s, t)))
            .collect()
    }
}

/// Signatures of the privileged lifecycle entry points. Kept configurable
/// because deployed contracts disagree on the exact names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub open: String,
    pub close: String,
    pub reset: String,
    pub resolve: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            open: "openMarket(uint256,uint256)".to_string(),
            close: "closeMarket()".to_string(),
            reset: "resetMarket()".to_string(),
            resolve: "resolveMarket(uint8)".to_string(),
        }
    }
}

fn default_receipt_poll_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// EIP-1193 style JSON-RPC provider holding the user's account. `None`
    /// means no wallet is installed.
    #[serde(default)]
    pub provider_url: Option<String>,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub http: HttpConfig,
    pub odds: OddsSourceConfig,
    pub chain: ChainConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
    #[serde(default)]
    pub swap: SwapConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    pub wallet: WalletConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                timeout_ms: 10_000,
                max_connections: 8,
            },
            odds: OddsSourceConfig {
                url: "http://localhost:3000/dortmund-odds".to_string(),
            },
            chain: ChainConfig {
                rpc_url: "http://127.0.0.1:8545".to_string(),
                market_address: Address::ZERO,
                probabilities_accessor: default_probabilities_accessor(),
                state_accessor: default_state_accessor(),
                probability_scale: default_probability_scale(),
                poll_interval_ms: default_poll_interval_ms(),
            },
            tokens: TokensConfig::default(),
            swap: SwapConfig::default(),
            lifecycle: LifecycleConfig::default(),
            wallet: WalletConfig {
                provider_url: None,
                receipt_poll_ms: default_receipt_poll_ms(),
            },
        }
    }
}
