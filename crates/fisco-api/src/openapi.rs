//! # OpenAPI Document Assembly
//!
//! Collects the utoipa-documented routes into one document served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the whole API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fisco API",
        version = "0.3.0",
        description = "Brazilian tax calculators (DIFAL, ICMS-ST and MVA lookup, federal withholding, IBS/CBS transition and reform) with audit trails, and NFe XML ingestion.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Calculators
        crate::routes::calc::difal,
        crate::routes::calc::difal_compare,
        crate::routes::calc::icms_st_calc,
        crate::routes::calc::icms_st_compare,
        crate::routes::calc::mva_lookup,
        crate::routes::calc::retencoes,
        crate::routes::calc::transicao,
        crate::routes::calc::transicao_compare,
        crate::routes::calc::ibs_cbs,
        crate::routes::calc::ibs_cbs_compare,
        // NFe
        crate::routes::nfe::extract_nfe,
        crate::routes::nfe::batch,
        crate::routes::nfe::report,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::routes::calc::DifalRequest,
        crate::routes::calc::IcmsStRequest,
        crate::routes::calc::MvaRequest,
        crate::routes::calc::RetencoesRequest,
        crate::routes::calc::TransicaoRequest,
        crate::routes::calc::TransicaoCompareRequest,
        crate::routes::calc::IbsCbsRequest,
        crate::routes::nfe::ExtractRequest,
        crate::routes::nfe::BatchRequest,
    )),
    tags(
        (name = "calc", description = "Tax calculators with memory trail and fingerprint"),
        (name = "nfe", description = "NFe XML extraction and DIFAL reporting"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
