//! # NFe API
//!
//! - **POST `/v1/nfe/extract`**: one XML document to extracted invoice data
//! - **POST `/v1/nfe/batch`**: many documents, per-document status
//! - **POST `/v1/nfe/report`**: batch plus DIFAL per invoice and totals
//!
//! XML parsing runs on the blocking pool.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use fisco_nfe::{extract, process_batch, report_batch, BatchDifalReport, BatchReport, ExtractedInvoice};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// A single NFe document.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtractRequest {
    /// NFe XML.
    pub xml: String,
}

/// A list of NFe documents.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchRequest {
    /// NFe XML documents, processed in order.
    pub xmls: Vec<String>,
}

/// Build the NFe router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/nfe/extract", post(extract_nfe))
        .route("/v1/nfe/batch", post(batch))
        .route("/v1/nfe/report", post(report))
}

/// POST /v1/nfe/extract
#[utoipa::path(
    post,
    path = "/v1/nfe/extract",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Extracted invoice data", body = serde_json::Value),
        (status = 400, description = "Document is not a readable NFe", body = ErrorBody),
    ),
    tag = "nfe"
)]
async fn extract_nfe(
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractedInvoice>, AppError> {
    let req = extract_json(body)?;
    let invoice = tokio::task::spawn_blocking(move || extract(&req.xml)).await??;
    Ok(Json(invoice))
}

/// POST /v1/nfe/batch
#[utoipa::path(
    post,
    path = "/v1/nfe/batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Per-document status and counts", body = serde_json::Value),
        (status = 400, description = "Malformed request body", body = ErrorBody),
    ),
    tag = "nfe"
)]
async fn batch(
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchReport>, AppError> {
    let req = extract_json(body)?;
    let report = tokio::task::spawn_blocking(move || process_batch(req.xmls)).await?;
    Ok(Json(report))
}

/// POST /v1/nfe/report
#[utoipa::path(
    post,
    path = "/v1/nfe/report",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Batch status, DIFAL per invoice and consolidated totals", body = serde_json::Value),
        (status = 400, description = "Malformed request body", body = ErrorBody),
    ),
    tag = "nfe"
)]
async fn report(
    State(state): State<AppState>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchDifalReport>, AppError> {
    let req = extract_json(body)?;
    let engine = state.engine.clone();
    let generated_at = Utc::now();
    let report = tokio::task::spawn_blocking(move || {
        report_batch(req.xmls, &engine.config().rates, generated_at)
    })
    .await?;
    tracing::info!(
        total = report.lote.total,
        calculos = report.calculos.len(),
        "NFe DIFAL report generated"
    );
    Ok(Json(report))
}
