use alloy_primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::MarketError;
use crate::model::{OutcomeQuote, Price};

/// Display precision for odds derived from on-chain probabilities.
pub const ODDS_DECIMALS: u32 = 2;

fn pow10(decimals: u32) -> Option<Decimal> {
    let raw = 10u128.checked_pow(decimals)?;
    Decimal::try_from_i128_with_scale(i128::try_from(raw).ok()?, 0).ok()
}

pub fn u256_to_decimal(value: U256) -> Option<Decimal> {
    let raw = u128::try_from(value).ok()?;
    Decimal::try_from_i128_with_scale(i128::try_from(raw).ok()?, 0).ok()
}

/// `scale / probability`, rounded for display. Zero or unrepresentable
/// probabilities yield `Unavailable`.
pub fn price_from_probability(probability: U256, scale: U256) -> Price {
    if probability.is_zero() {
        return Price::Unavailable;
    }
    let (Some(p), Some(s)) = (u256_to_decimal(probability), u256_to_decimal(scale)) else {
        return Price::Unavailable;
    };
    match s.checked_div(p) {
        Some(v) => Price::from_decimal(
            v.round_dp_with_strategy(ODDS_DECIMALS, RoundingStrategy::MidpointAwayFromZero),
        ),
        None => Price::Unavailable,
    }
}

pub fn odds_from_probabilities(win: U256, draw: U256, lose: U256, scale: U256) -> OutcomeQuote {
    OutcomeQuote {
        win: price_from_probability(win, scale),
        draw: price_from_probability(draw, scale),
        lose: price_from_probability(lose, scale),
    }
}

/// Human amount to token base units, truncating digits beyond `decimals`.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<U256, MarketError> {
    if amount <= Decimal::ZERO {
        return Err(MarketError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    let factor = pow10(decimals)
        .ok_or_else(|| MarketError::InvalidAmount(format!("unsupported decimals {}", decimals)))?;
    let scaled = amount
        .checked_mul(factor)
        .ok_or_else(|| MarketError::InvalidAmount(format!("amount {} too large", amount)))?;
    let units = scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| MarketError::InvalidAmount(format!("amount {} not representable", amount)))?;
    if units == 0 {
        return Err(MarketError::InvalidAmount(format!(
            "amount {} is below the token's smallest unit",
            amount
        )));
    }
    Ok(U256::from(units))
}

pub fn from_base_units(raw: U256, decimals: u32) -> Option<Decimal> {
    let v = i128::try_from(u128::try_from(raw).ok()?).ok()?;
    Decimal::try_from_i128_with_scale(v, decimals)
        .ok()
        .map(|d| d.normalize())
}

/// Parses user input; accepts plain or scientific notation, rejects
/// non-positive and non-numeric values.
pub fn parse_amount(input: &str) -> Result<Decimal, MarketError> {
    let trimmed = input.trim();
    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| MarketError::InvalidAmount(format!("'{}' is not a number", input)))?;
    if value <= Decimal::ZERO {
        return Err(MarketError::InvalidAmount(format!(
            "amount must be positive, got {}",
            value
        )));
    }
    Ok(value)
}
