//! Safe conversion of untrusted external numerics.
//!
//! Every boundary where an amount string or number from an upstream API
//! enters arithmetic or transaction construction goes through this module.
//! Conversions never panic and never error: junk input yields the caller's
//! fallback and a logged warning, because upstream data must not be able to
//! crash the execution path.

use alloy_primitives::U256;
use serde_json::Value;
use tracing::warn;

/// String tokens some upstreams emit where a number belongs.
const JUNK_SENTINELS: [&str; 3] = ["NaN", "null", "undefined"];

/// Converts an untrusted JSON value holding a smallest-unit amount into an
/// exact integer, returning `fallback` on anything unusable.
///
/// Decimal inputs are floored. Negative values are junk here: on-chain
/// amounts are unsigned.
pub fn exact_amount(value: &Value, fallback: U256) -> U256 {
    match value {
        Value::Null => {
            warn!("exact_amount: null value, using fallback");
            fallback
        }
        Value::String(raw) => exact_amount_str(raw, fallback),
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                return U256::from(unsigned);
            }
            match number.as_f64() {
                Some(float) if float.is_finite() && float >= 0.0 => {
                    U256::from(float.floor() as u128)
                }
                _ => {
                    warn!(%number, "exact_amount: unusable number, using fallback");
                    fallback
                }
            }
        }
        other => {
            warn!(value = %other, "exact_amount: non-numeric value, using fallback");
            fallback
        }
    }
}

/// Plain-string variant of [`exact_amount`], for fields already typed as
/// strings on the wire.
pub fn exact_amount_str(raw: &str, fallback: U256) -> U256 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || JUNK_SENTINELS.contains(&trimmed) {
        warn!(raw, "exact_amount: junk string, using fallback");
        return fallback;
    }
    if let Ok(exact) = U256::from_str_radix(trimmed, 10) {
        return exact;
    }
    // Not a plain integer; accept a decimal representation by flooring.
    match trimmed.parse::<f64>() {
        Ok(float) if float.is_finite() && float >= 0.0 => U256::from(float.floor() as u128),
        _ => {
            warn!(raw, "exact_amount: unparsable string, using fallback");
            fallback
        }
    }
}

/// Converts an untrusted JSON value into a float, returning `fallback` on
/// anything unusable. Used for percentages and price-impact figures.
pub fn safe_float(value: &Value, fallback: f64) -> f64 {
    match value {
        Value::Null => fallback,
        Value::String(raw) => safe_float_str(raw, fallback),
        Value::Number(number) => number
            .as_f64()
            .filter(|float| float.is_finite())
            .unwrap_or(fallback),
        _ => fallback,
    }
}

/// Plain-string variant of [`safe_float`].
pub fn safe_float_str(raw: &str, fallback: f64) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || JUNK_SENTINELS.contains(&trimmed) {
        return fallback;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|float| float.is_finite())
        .unwrap_or(fallback)
}

/// Converts a human-readable amount into smallest units, flooring.
///
/// Non-finite or negative inputs yield zero.
pub fn to_base_units(amount: f64, decimals: u32) -> U256 {
    if !amount.is_finite() || amount < 0.0 {
        warn!(amount, "to_base_units: unusable amount, using zero");
        return U256::ZERO;
    }
    U256::from((amount * 10f64.powi(decimals as i32)).floor() as u128)
}

/// Formats a smallest-unit amount as a human-readable decimal string with
/// up to six fractional digits, trailing zeros trimmed.
pub fn format_units(amount: U256, decimals: u32) -> String {
    let scale = U256::from(10).pow(U256::from(decimals));
    let whole = amount / scale;
    let fraction = amount % scale;
    if fraction.is_zero() {
        return whole.to_string();
    }
    let mut digits = fraction.to_string();
    while (digits.len() as u32) < decimals {
        digits.insert(0, '0');
    }
    digits.truncate(6);
    let trimmed = digits.trim_end_matches('0');
    if trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case::nan("NaN")]
    #[case::null_literal("null")]
    #[case::undefined_literal("undefined")]
    #[case::empty("")]
    #[case::whitespace("   ")]
    #[case::garbage("12abc")]
    #[case::negative("-5")]
    fn test_exact_amount_str_falls_back(#[case] raw: &str) {
        assert_eq!(exact_amount_str(raw, U256::ZERO), U256::ZERO);
        assert_eq!(exact_amount_str(raw, U256::from(7)), U256::from(7));
    }

    #[test]
    fn test_exact_amount_str_parses_integers() {
        assert_eq!(exact_amount_str("1000000", U256::ZERO), U256::from(1_000_000u64));
        assert_eq!(exact_amount_str(" 42 ", U256::ZERO), U256::from(42u64));
    }

    #[test]
    fn test_exact_amount_str_floors_decimals() {
        assert_eq!(exact_amount_str("12.9", U256::ZERO), U256::from(12u64));
    }

    #[test]
    fn test_exact_amount_handles_json_shapes() {
        assert_eq!(exact_amount(&json!(null), U256::from(3)), U256::from(3));
        assert_eq!(exact_amount(&json!("2500"), U256::ZERO), U256::from(2500u64));
        assert_eq!(exact_amount(&json!(2500), U256::ZERO), U256::from(2500u64));
        assert_eq!(exact_amount(&json!(12.9), U256::ZERO), U256::from(12u64));
        assert_eq!(exact_amount(&json!(-1), U256::from(9)), U256::from(9));
        assert_eq!(exact_amount(&json!({"nested": 1}), U256::from(9)), U256::from(9));
    }

    #[test]
    fn test_safe_float() {
        assert_eq!(safe_float(&json!("0.02"), 0.0), 0.02);
        assert_eq!(safe_float(&json!(1.5), 0.0), 1.5);
        assert_eq!(safe_float(&json!(null), 0.5), 0.5);
        assert_eq!(safe_float(&json!("NaN"), 0.5), 0.5);
        assert_eq!(safe_float(&json!([]), 0.5), 0.5);
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(to_base_units(100.0, 6), U256::from(100_000_000u64));
        assert_eq!(to_base_units(1.5, 18), U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(to_base_units(0.0, 6), U256::ZERO);
        assert_eq!(to_base_units(-3.0, 6), U256::ZERO);
        assert_eq!(to_base_units(f64::NAN, 6), U256::ZERO);
    }

    #[test]
    fn test_to_base_units_floors() {
        // 0.1234567 USDC has no exact 6-decimal representation past the floor.
        assert_eq!(to_base_units(0.1234567, 6), U256::from(123_456u64));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(100_000_000u64), 6), "100");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1_234_567u64), 6), "1.234567");
        assert_eq!(format_units(U256::ZERO, 18), "0");
        assert_eq!(format_units(U256::from(5u64), 6), "0.000005");
    }
}
