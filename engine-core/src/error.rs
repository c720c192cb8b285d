use thiserror::Error;

/// Failures scoped to a single operation. Read-path variants are absorbed by
/// the caller; write-path variants are surfaced with the action that caused
/// them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarketError {
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("chain read failed: {0}")]
    ChainReadFailure(String),

    #[error("no wallet provider available")]
    NoWallet,

    #[error("no connected account")]
    NoSigner,

    #[error("transaction rejected or reverted: {reason}")]
    TransactionRejectedOrReverted { reason: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("config error: {0}")]
    Config(String),
}

impl MarketError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::TransactionRejectedOrReverted {
            reason: reason.into(),
        }
    }

    pub fn is_read_path(&self) -> bool {
        matches!(self, Self::QuoteUnavailable(_) | Self::ChainReadFailure(_))
    }
}
