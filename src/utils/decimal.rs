//! Money rounding and lenient number coercion.
//!
//! The pricing math runs in `f64`; anything that is presented as money goes
//! through `Decimal` so that cent rounding is exact.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

/// Round a price to whole cents (half away from zero).
///
/// Non-finite input is returned unchanged.
pub fn round_penny(value: f64) -> f64 {
    match Decimal::from_f64_retain(value) {
        Some(d) => d
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or(value),
        None => value,
    }
}

/// Coerce an arbitrary JSON value into a finite number.
///
/// Numbers and numeric strings pass through; everything else (null, bools,
/// NaN, garbage strings) becomes 0.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Parse a free-form budget string such as `"$2,500"`.
///
/// Everything except digits and `.` is stripped. Returns `None` when nothing
/// parseable is left or the amount is not positive.
pub fn parse_budget(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .ok()
        .filter(|budget| *budget > Decimal::ZERO)
}

/// Safe division that returns zero if the divisor is zero or the result is not finite.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let q = numerator / denominator;
    if q.is_finite() {
        q
    } else {
        0.0
    }
}
