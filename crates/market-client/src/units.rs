//! Ether unit helpers.
//!
//! Amounts travel as wei (`U256`); humans type and read ether with up to
//! 18 decimals.

use market_ledger::domain::value_objects::{U256, WEI_PER_ETHER};
use thiserror::Error;

/// Decimal places of one ether.
pub const ETHER_DECIMALS: usize = 18;

/// Errors parsing a decimal ether amount.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitsError {
    /// Nothing to parse.
    #[error("empty amount")]
    Empty,

    /// A character other than a digit or a single decimal point.
    #[error("invalid amount: {0}")]
    Invalid(String),

    /// More than 18 fractional digits.
    #[error("too many decimals: {0} > 18")]
    TooManyDecimals(usize),

    /// Does not fit in 256 bits.
    #[error("amount overflows 256 bits")]
    Overflow,
}

/// Parse a decimal ether string (`"0.01"`, `"5"`, `".5"`) into wei.
pub fn parse_ether(input: &str) -> Result<U256, UnitsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, fraction) = match input.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (input, ""),
    };
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(UnitsError::Invalid(input.to_string()));
    }
    if fraction.len() > ETHER_DECIMALS {
        return Err(UnitsError::TooManyDecimals(fraction.len()));
    }

    let whole_wei = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole)
            .map_err(|_| UnitsError::Overflow)?
            .checked_mul(U256::from(WEI_PER_ETHER))
            .ok_or(UnitsError::Overflow)?
    };

    let fraction_wei = if fraction.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{fraction:0<width$}", width = ETHER_DECIMALS);
        U256::from_dec_str(&padded).map_err(|_| UnitsError::Overflow)?
    };

    whole_wei
        .checked_add(fraction_wei)
        .ok_or(UnitsError::Overflow)
}

/// Format wei as a decimal ether string. Whole amounts keep one decimal
/// (`"1.0"`); trailing zeros are dropped otherwise.
#[must_use]
pub fn format_ether(wei: U256) -> String {
    let unit = U256::from(WEI_PER_ETHER);
    let whole = wei / unit;
    let fraction = wei % unit;

    let digits = format!("{:0>width$}", fraction.to_string(), width = ETHER_DECIMALS);
    let trimmed = digits.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{trimmed}")
    }
}
