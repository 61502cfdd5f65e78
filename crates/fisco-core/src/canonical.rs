//! # Canonical Audit Input
//!
//! [`CanonicalInput`] is the only value a fingerprint can be computed from.
//! Its inner string is private and built field by field through
//! [`CanonicalInputBuilder`], so every calculator serializes its defining
//! inputs the same way:
//!
//! - amounts and rates are rendered with exactly two decimals, ties rounded
//!   away from zero (`0.125` → `0.13`);
//! - text is taken verbatim;
//! - absent optional text falls back to an explicit placeholder;
//! - fields are joined with `|` in call order.

/// Field separator in canonical strings.
pub const SEPARATOR: char = '|';

/// An ordered, pipe-joined serialization of a calculation's defining inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalInput(String);

impl CanonicalInput {
    /// Start building a canonical input.
    pub fn builder() -> CanonicalInputBuilder {
        CanonicalInputBuilder { fields: Vec::new() }
    }

    /// The canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accumulates canonical fields in order.
#[derive(Debug, Clone, Default)]
pub struct CanonicalInputBuilder {
    fields: Vec<String>,
}

impl CanonicalInputBuilder {
    /// Append a decimal rendered with two fixed decimals.
    pub fn amount(mut self, value: f64) -> Self {
        self.fields.push(fixed2(value));
        self
    }

    /// Append an integer.
    pub fn integer(mut self, value: i64) -> Self {
        self.fields.push(value.to_string());
        self
    }

    /// Append text verbatim.
    pub fn text(mut self, value: impl AsRef<str>) -> Self {
        self.fields.push(value.as_ref().to_string());
        self
    }

    /// Append optional text, or `fallback` when absent.
    pub fn text_or(self, value: Option<&str>, fallback: &str) -> Self {
        self.text(value.unwrap_or(fallback))
    }

    /// Join the accumulated fields.
    pub fn finish(self) -> CanonicalInput {
        let mut out = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(SEPARATOR);
            }
            out.push_str(field);
        }
        CanonicalInput(out)
    }
}

/// Two-decimal rendering with ties away from zero.
///
/// `format!("{:.2}")` rounds exact binary ties to even; amounts such as
/// `0.125` must render as `0.13` so fingerprints stay stable across the
/// platforms that produced earlier ones.
fn fixed2(value: f64) -> String {
    let wide = format!("{:.40}", value.abs());
    let is_tie = wide
        .split_once('.')
        .map(|(_, frac)| {
            frac.as_bytes().get(2) == Some(&b'5') && frac.bytes().skip(3).all(|b| b == b'0')
        })
        .unwrap_or(false);
    if is_tie {
        let nudged = value + value.signum() * 0.001;
        format!("{nudged:.2}")
    } else {
        format!("{value:.2}")
    }
}
