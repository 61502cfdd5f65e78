//! # Request Extraction
//!
//! Request DTOs carry loosely typed fields (numbers or locale-formatted
//! strings, UF codes as text). [`IntoInput`] turns a DTO into the
//! calculator's typed input, naming the offending field on failure.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use fisco_core::{Uf, ValidationError};
use fisco_engine::EngineConfig;

use crate::error::AppError;

/// Conversion from a request DTO into a calculator input.
pub trait IntoInput {
    /// The calculator input.
    type Input;

    /// Validate and convert, filling defaults from `config`.
    fn into_input(self, config: &EngineConfig) -> Result<Self::Input, ValidationError>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and convert it with [`IntoInput`].
pub fn extract_input<T: IntoInput>(
    result: Result<Json<T>, JsonRejection>,
    config: &EngineConfig,
) -> Result<T::Input, AppError> {
    let value = extract_json(result)?;
    Ok(value.into_input(config)?)
}

/// Parse an optional UF field. Blank means absent.
pub fn optional_uf(field: &'static str, value: Option<&str>) -> Result<Option<Uf>, ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(code) => Uf::parse_field(field, code).map(Some),
        None => Ok(None),
    }
}
