//! # Numeric Normalization
//!
//! Brazilian users type amounts as `1.234,56`, spreadsheets export `1234.56`,
//! and JSON clients send bare numbers. Everything that reaches a calculator
//! goes through [`normalize`] (or [`DecimalInput::parse`]) first.
//!
//! Rules, applied in order:
//!
//! 1. If both `,` and `.` occur, `.` is a thousands separator: strip every
//!    `.` and turn `,` into the decimal point.
//! 2. If only `,` occurs, it is the decimal point.
//! 3. Drop anything that is not a digit, `.` or `-`.
//! 4. Read the longest leading decimal literal. Trailing garbage after a
//!    valid prefix is ignored (`"12.5.3"` reads as `12.5`).
//!
//! Results are rounded for output with [`round2`], which rounds halves up
//! (towards positive infinity) to the cent.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

fn decimal_prefix() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)").ok())
        .as_ref()
}

/// Normalize a locale-formatted decimal string into a finite `f64`.
///
/// Returns `None` for empty, non-numeric, or non-finite input.
pub fn normalize(raw: &str) -> Option<f64> {
    let has_comma = raw.contains(',');
    let has_dot = raw.contains('.');

    let swapped = match (has_comma, has_dot) {
        (true, true) => raw.replace('.', "").replace(',', "."),
        (true, false) => raw.replace(',', "."),
        _ => raw.to_string(),
    };

    let cleaned: String = swapped
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let literal = decimal_prefix()?.find(&cleaned)?.as_str();
    literal.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A decimal value as received from an external caller: either a JSON number
/// or a locale-formatted string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    /// A bare number.
    Number(f64),
    /// A string to be run through [`normalize`].
    Text(String),
}

impl DecimalInput {
    /// Normalize into a finite number.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::Text(s) => normalize(s),
        }
    }

    /// Normalize and require a finite, non-negative value, naming `field`
    /// on failure.
    pub fn parse(&self, field: &'static str) -> Result<f64, ValidationError> {
        let value = self.value().ok_or_else(|| ValidationError::NotANumber {
            field,
            value: self.to_string(),
        })?;
        non_negative(field, value)
    }
}

impl std::fmt::Display for DecimalInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for DecimalInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for DecimalInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Parse an optional input that defaults to zero when absent.
pub fn parse_optional(
    field: &'static str,
    input: Option<&DecimalInput>,
) -> Result<f64, ValidationError> {
    input.map_or(Ok(0.0), |v| v.parse(field))
}

/// Parse a required input, reporting [`ValidationError::Missing`] when absent.
pub fn parse_required(
    field: &'static str,
    input: Option<&DecimalInput>,
) -> Result<f64, ValidationError> {
    input
        .ok_or(ValidationError::Missing { field })
        .and_then(|v| v.parse(field))
}

/// Require a finite, non-negative value.
pub fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotANumber {
            field,
            value: value.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(value)
}

/// Require a finite value strictly greater than zero.
pub fn positive(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    let value = non_negative(field, value).map_err(|e| match e {
        ValidationError::Negative { field, value } => ValidationError::NotPositive { field, value },
        other => other,
    })?;
    if value == 0.0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(value)
}

/// Require a percentage strictly below `limit`.
pub fn below(field: &'static str, value: f64, limit: f64) -> Result<f64, ValidationError> {
    if value >= limit {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            limit,
        });
    }
    Ok(value)
}

/// Round to two decimal places, halves towards positive infinity.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Format a monetary value for memory trails: `R$ 1060.24`.
pub fn format_brl(value: f64) -> String {
    format!("R$ {value:.2}")
}

/// Format a percentage rate for memory trails: `17.00%`.
pub fn format_rate(value: f64) -> String {
    format!("{value:.2}%")
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Normalization never panics on arbitrary input.
        #[test]
        fn normalize_never_panics(s in ".{0,40}") {
            let _ = normalize(&s);
        }

        /// Any non-negative integer-cent amount survives the Brazilian format.
        #[test]
        fn brazilian_format_roundtrips(cents in 0u64..100_000_000_000u64) {
            let int = cents / 100;
            let frac = cents % 100;
            let mut grouped = String::new();
            let digits = int.to_string();
            for (i, c) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push('.');
                }
                grouped.push(c);
            }
            let text = format!("{grouped},{frac:02}");
            let parsed = normalize(&text).unwrap();
            prop_assert!((parsed - cents as f64 / 100.0).abs() < 1e-6, "{} -> {}", text, parsed);
        }

        /// Rounded values carry at most two decimal digits.
        #[test]
        fn round2_has_two_decimals(v in -1.0e7f64..1.0e7f64) {
            let r = round2(v);
            prop_assert!(((r * 100.0).round() - r * 100.0).abs() < 1e-6);
        }
    }
}
