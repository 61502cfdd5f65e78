//! # API Error Types
//!
//! Maps engine errors to HTTP responses. Client errors return `400` with
//! `{error}` (plus the rejected `field` when known); unexpected failures
//! return `500` with `{error, details}` and are logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fisco_core::{CalculationError, ParseError, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON error body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Rejected input field, for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Failure detail, for server errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Request body could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// An input field was rejected (400).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An NFe document could not be read (400).
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The calculation failed after validation (500).
    #[error("{operation}: {detail}")]
    Calculation {
        /// Failing step.
        operation: &'static str,
        /// What went wrong.
        detail: String,
    },

    /// Anything else (500).
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Parse(_) => (StatusCode::BAD_REQUEST, "PARSE_ERROR"),
            Self::Calculation { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CALCULATION_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<CalculationError> for AppError {
    fn from(err: CalculationError) -> Self {
        match err {
            CalculationError::Validation(v) => Self::Validation(v),
            CalculationError::ArithmeticEdgeCase { operation, detail } => {
                Self::Calculation { operation, detail }
            }
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
            ErrorBody {
                error: "Erro ao processar cálculo".to_string(),
                field: None,
                details: Some(self.to_string()),
            }
        } else {
            let field = match &self {
                Self::Validation(v) => Some(v.field().to_string()),
                _ => None,
            };
            ErrorBody {
                error: self.to_string(),
                field,
                details: None,
            }
        };

        (status, Json(body)).into_response()
    }
}
