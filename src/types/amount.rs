//! Amount representation
//!
//! Balances are kept as integer milligrams of tea. Human-facing text uses
//! grams with at most three decimal places; conversion goes through
//! `Decimal` so no binary floating point is ever involved.

use super::error::LedgerError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Amount in the smallest currency unit (milligrams)
pub type Amount = u64;

/// Minor units per displayed unit
pub const MINOR_UNITS_PER_GRAM: u64 = 1000;

/// Decimal places of the displayed unit
pub const GRAM_SCALE: u32 = 3;

/// Parse a gram amount such as `"12.345"` into milligrams
///
/// Rejects negative values, more than three decimal places, and values that
/// do not fit in `u64` milligrams.
pub fn parse_grams(input: &str) -> Result<Amount, LedgerError> {
    let trimmed = input.trim();
    let grams =
        Decimal::from_str(trimmed).map_err(|_| LedgerError::invalid_amount(trimmed))?;

    if grams.is_sign_negative() || grams.normalize().scale() > GRAM_SCALE {
        return Err(LedgerError::invalid_amount(trimmed));
    }

    grams
        .checked_mul(Decimal::from(MINOR_UNITS_PER_GRAM))
        .and_then(|minor| minor.to_u64())
        .ok_or_else(|| LedgerError::invalid_amount(trimmed))
}

/// Format milligrams as grams with exactly three decimal places
pub fn format_grams(amount: Amount) -> String {
    Decimal::from_i128_with_scale(i128::from(amount), GRAM_SCALE).to_string()
}
