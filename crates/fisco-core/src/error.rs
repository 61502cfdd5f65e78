//! # Error Hierarchy
//!
//! Structured error types for the fiscal engine, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! - [`ValidationError`]: an input field is missing, non-numeric, or out of
//!   range. Always names the offending field.
//! - [`ParseError`]: an NFe document is malformed or lacks an expected node.
//! - [`CalculationError`]: what a calculator returns. Wraps validation
//!   failures and the arithmetic edge cases caught after evaluation.

use thiserror::Error;

/// Top-level error returned by every calculator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculationError {
    /// An input field was rejected before any arithmetic took place.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Evaluation produced a non-finite intermediate value.
    #[error("arithmetic edge case in {operation}: {detail}")]
    ArithmeticEdgeCase {
        /// The calculation step that failed.
        operation: &'static str,
        /// What went wrong (e.g. "division by zero").
        detail: String,
    },
}

impl CalculationError {
    /// Return the offending field name for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation(v) => Some(v.field()),
            Self::ArithmeticEdgeCase { .. } => None,
        }
    }
}

/// Input validation failures.
///
/// Every variant carries the external (camelCase) field name so callers can
/// show users exactly which input was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required field was absent.
    #[error("missing required field `{field}`")]
    Missing {
        /// Field name.
        field: &'static str,
    },

    /// Field could not be normalized into a finite number.
    #[error("invalid field `{field}`: \"{value}\" is not a number")]
    NotANumber {
        /// Field name.
        field: &'static str,
        /// The raw input as received.
        value: String,
    },

    /// Field is negative where only non-negative values are allowed.
    #[error("invalid field `{field}`: must not be negative (got {value})")]
    Negative {
        /// Field name.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Field must be strictly greater than zero.
    #[error("invalid field `{field}`: must be greater than zero (got {value})")]
    NotPositive {
        /// Field name.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Field must stay strictly below an upper bound.
    #[error("invalid field `{field}`: must be below {limit} (got {value})")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Exclusive upper bound.
        limit: f64,
    },

    /// Field held a code outside its closed enumeration.
    #[error("invalid field `{field}`: unknown value \"{value}\"")]
    UnknownValue {
        /// Field name.
        field: &'static str,
        /// The unrecognized code.
        value: String,
    },

    /// Field does not have the expected shape.
    #[error("invalid field `{field}`: \"{value}\" must be {expected}")]
    BadFormat {
        /// Field name.
        field: &'static str,
        /// The raw input as received.
        value: String,
        /// Description of the accepted shape.
        expected: &'static str,
    },
}

impl ValidationError {
    /// The external name of the rejected field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Missing { field }
            | Self::NotANumber { field, .. }
            | Self::Negative { field, .. }
            | Self::NotPositive { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::UnknownValue { field, .. }
            | Self::BadFormat { field, .. } => field,
        }
    }
}

/// NFe document parsing failures.
///
/// Messages for structural failures are the user-facing texts shown by the
/// portal, so they stay in Portuguese.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("Erro ao processar XML: {0}")]
    Malformed(String),

    /// No `NFe` element at the root or under `nfeProc`.
    #[error("XML não é uma NFe válida")]
    NotAnInvoice,

    /// `NFe` is present but has no `infNFe` child.
    #[error("Estrutura NFe inválida")]
    MissingInvoiceInfo,
}
