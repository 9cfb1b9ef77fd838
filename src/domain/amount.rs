//! Rent amounts
//!
//! Stall rent and transaction amounts are plain `Decimal` values. Input
//! arrives as a JSON number or a numeric string and is coerced here.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Maximum decimal places kept for rent amounts
const MAX_SCALE: u32 = 4;

/// Errors that can occur when coercing an amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must not be negative (got {0})")]
    Negative(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

/// Coerce a JSON value into a validated amount.
///
/// Accepts numbers (`1000`, `12.5`) and numeric strings (`" 1000 "`).
pub fn parse_amount(value: &Value) -> Result<Decimal, AmountError> {
    let parsed = match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|_| AmountError::ParseError(text))?
        }
        Value::String(s) => Decimal::from_str(s.trim())
            .map_err(|_| AmountError::ParseError(s.clone()))?,
        other => return Err(AmountError::ParseError(other.to_string())),
    };

    validate_amount(parsed)
}

/// Check the business rules on an already typed amount.
pub fn validate_amount(value: Decimal) -> Result<Decimal, AmountError> {
    if value < Decimal::ZERO {
        return Err(AmountError::Negative(value));
    }
    let value = value.normalize();
    if value.scale() > MAX_SCALE {
        return Err(AmountError::TooManyDecimals(value.scale()));
    }
    Ok(value)
}
