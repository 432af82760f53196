//! Decimal amount helpers
//!
//! Balances travel through the crate as decimal strings (possibly with `,`
//! thousands separators). These helpers parse them into [`BigDecimal`],
//! convert base units and format for display.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, RoundingMode, Zero};
use eyre::{eyre, Result};
use std::str::FromStr;
use thiserror::Error;

/// Decimals of native SCRT (`uscrt`)
pub const SCRT_DECIMALS: u32 = 6;

/// Decimals of native ETH (wei)
pub const ETH_DECIMALS: u32 = 18;

/// Parse a user or balance string, ignoring `,` separators
pub fn parse_amount(value: &str) -> Result<BigDecimal> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(eyre!("Empty amount"));
    }
    BigDecimal::from_str(&cleaned).map_err(|e| eyre!("Invalid amount '{}': {}", value, e))
}

/// Decimal places accepted in the amount field
pub const INPUT_DECIMALS: usize = 6;

/// Rejected amount field input
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AmountInputError {
    #[error("not a plain decimal number")]
    Malformed,

    #[error("more than {0} decimal places")]
    TooPrecise(usize),
}

/// Parse what the user typed: plain digits with an optional fraction of at
/// most [`INPUT_DECIMALS`] places. Signs and exponents are rejected.
pub fn parse_input_amount(value: &str) -> std::result::Result<BigDecimal, AmountInputError> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    let (int_part, frac_part) = match cleaned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (cleaned.as_str(), ""),
    };

    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !digits_only(int_part) || !digits_only(frac_part) {
        return Err(AmountInputError::Malformed);
    }
    if frac_part.len() > INPUT_DECIMALS {
        return Err(AmountInputError::TooPrecise(INPUT_DECIMALS));
    }

    BigDecimal::from_str(&cleaned).map_err(|_| AmountInputError::Malformed)
}

/// Parse a bound (min/max); anything unparseable counts as zero
pub fn parse_bound(value: &str) -> BigDecimal {
    parse_amount(value).unwrap_or_else(|_| BigDecimal::zero())
}

/// Convert an integer amount in base units to a decimal string
pub fn from_base_units(amount: u128, decimals: u32) -> String {
    let value = BigDecimal::new(BigInt::from(amount), decimals as i64);
    format_decimal(&value, decimals)
}

/// Format with at most six decimals (rounded down), trailing zeros trimmed.
/// Input that does not parse is returned unchanged.
pub fn format_with_six_decimals(value: &str) -> String {
    match parse_amount(value) {
        Ok(amount) => format_decimal(&amount, 6),
        Err(_) => value.to_string(),
    }
}

fn format_decimal(value: &BigDecimal, max_decimals: u32) -> String {
    let rounded = value.with_scale_round(max_decimals as i64, RoundingMode::Down);
    let (digits, scale) = rounded.as_bigint_and_exponent();

    let negative = digits < BigInt::zero();
    let mut text = digits.magnitude().to_string();
    let scale = scale.max(0) as usize;

    if text.len() <= scale {
        text = format!("{}{}", "0".repeat(scale - text.len() + 1), text);
    }

    let (int_part, frac_part) = text.split_at(text.len() - scale);
    let frac_part = frac_part.trim_end_matches('0');

    let mut result = String::new();
    if negative {
        result.push('-');
    }
    result.push_str(int_part);
    if !frac_part.is_empty() {
        result.push('.');
        result.push_str(frac_part);
    }
    result
}
