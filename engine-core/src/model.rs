use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::MarketError;

pub type TimestampSecs = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Win,
    Draw,
    Lose,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Win, Outcome::Draw, Outcome::Lose];

    /// 0-indexed position used by the market contract when resolving.
    pub fn index(self) -> u8 {
        match self {
            Outcome::Win => 0,
            Outcome::Draw => 1,
            Outcome::Lose => 2,
        }
    }

    pub fn from_index(idx: u8) -> Option<Self> {
        Self::ALL.get(idx as usize).copied()
    }

    pub fn symbol(self) -> TokenSymbol {
        match self {
            Outcome::Win => TokenSymbol::Win,
            Outcome::Draw => TokenSymbol::Draw,
            Outcome::Lose => TokenSymbol::Lose,
        }
    }
}

impl FromStr for Outcome {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win" | "0" => Ok(Outcome::Win),
            "draw" | "1" => Ok(Outcome::Draw),
            "lose" | "2" => Ok(Outcome::Lose),
            other => Err(MarketError::Config(format!("unknown outcome '{}'", other))),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.symbol().fmt(f)
    }
}

/// Decimal odds for one outcome, or the explicit "unavailable" marker.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Price {
    Available(Decimal),
    #[default]
    Unavailable,
}

impl Price {
    /// Non-positive values are not valid odds.
    pub fn from_decimal(value: Decimal) -> Self {
        if value > Decimal::ZERO {
            Price::Available(value)
        } else {
            Price::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Price::Available(_))
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Price::Available(v) => Some(*v),
            Price::Unavailable => None,
        }
    }

    /// First available of `self`, then `fallback`.
    pub fn or(self, fallback: Price) -> Price {
        match self {
            Price::Available(_) => self,
            Price::Unavailable => fallback,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Available(v) => write!(f, "{:.2}", v),
            Price::Unavailable => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeQuote {
    pub win: Price,
    pub draw: Price,
    pub lose: Price,
}

impl OutcomeQuote {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn get(&self, outcome: Outcome) -> Price {
        match outcome {
            Outcome::Win => self.win,
            Outcome::Draw => self.draw,
            Outcome::Lose => self.lose,
        }
    }

    pub fn is_empty(&self) -> bool {
        Outcome::ALL.iter().all(|o| !self.get(*o).is_available())
    }
}

impl fmt::Display for OutcomeQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WIN: {}  DRAW: {}  LOSE: {}",
            self.win, self.draw, self.lose
        )
    }
}

/// Raw lifecycle tuple as reported by the market contract. Contradictory
/// flags are kept as-is.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarketStatus {
    pub is_open: bool,
    pub is_closed: bool,
    pub is_resolved: bool,
    pub start_time: TimestampSecs,
    pub close_time: TimestampSecs,
}

impl MarketStatus {
    pub fn start_time_local(&self) -> String {
        format_timestamp(self.start_time)
    }

    pub fn close_time_local(&self) -> String {
        format_timestamp(self.close_time)
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "open={} closed={} resolved={} start={} close={}",
            self.is_open,
            self.is_closed,
            self.is_resolved,
            self.start_time_local(),
            self.close_time_local()
        )
    }
}

/// Local wall-clock rendering; falls back to the raw number when the value
/// is outside chrono's range.
pub fn format_timestamp(secs: TimestampSecs) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| secs.to_string())
}

/// Address-like token identifier. Equality and ordering ignore ASCII case;
/// the original spelling is kept for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn normalized(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    pub fn to_address(&self) -> Result<Address, MarketError> {
        Address::from_str(self.0.trim())
            .map_err(|err| MarketError::InvalidToken(format!("{}: {}", self.0, err)))
    }
}

impl From<Address> for TokenId {
    fn from(addr: Address) -> Self {
        Self(addr.to_checksum(None))
    }
}

impl PartialEq for TokenId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for TokenId {}

impl Ord for TokenId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .bytes()
            .map(|b| b.to_ascii_lowercase())
            .cmp(other.0.bytes().map(|b| b.to_ascii_lowercase()))
    }
}

impl PartialOrd for TokenId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for TokenId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenSymbol {
    Usdc,
    Win,
    Draw,
    Lose,
}

impl TokenSymbol {
    pub const ALL: [TokenSymbol; 4] = [
        TokenSymbol::Usdc,
        TokenSymbol::Win,
        TokenSymbol::Draw,
        TokenSymbol::Lose,
    ];
}

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenSymbol::Usdc => "USDC",
            TokenSymbol::Win => "WIN",
            TokenSymbol::Draw => "DRAW",
            TokenSymbol::Lose => "LOSE",
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Balance {
    Available(Decimal),
    Unavailable,
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Balance::Available(v) => write!(f, "{}", v),
            Balance::Unavailable => f.write_str("-"),
        }
    }
}

/// Balances of one account, recomputed wholesale on every refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceSet {
    pub account: Address,
    pub balances: BTreeMap<TokenSymbol, Balance>,
}

impl BalanceSet {
    pub fn get(&self, symbol: TokenSymbol) -> Option<Balance> {
        self.balances.get(&symbol).copied()
    }
}

/// One trade, constructed at execution time and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapIntent {
    pub input_token: TokenId,
    pub output_token: TokenId,
    pub amount: Decimal,
    pub input_decimals: u32,
    pub recipient: Address,
}

/// A fully encoded contract call ready for the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub label: String,
}

impl CallDescriptor {
    pub fn new(to: Address, data: impl Into<Bytes>, label: impl Into<String>) -> Self {
        Self {
            to,
            data: data.into(),
            value: U256::ZERO,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}
