//! # Calculator API
//!
//! - **POST `/v1/calc/difal`**: DIFAL with memory trail and fingerprint
//! - **POST `/v1/calc/difal/compare`**: single vs dual base
//! - **POST `/v1/calc/icms-st`**: ICMS-ST with memory trail and fingerprint
//! - **POST `/v1/calc/icms-st/compare`**: original vs adjusted MVA
//! - **POST `/v1/calc/mva`**: agreed MVA for an NCM and route
//! - **POST `/v1/calc/retencoes`**: federal withholding on services
//! - **POST `/v1/calc/transicao`**: IBS/CBS blend for one year
//! - **POST `/v1/calc/transicao/compare`**: blend for every scheduled year
//! - **POST `/v1/calc/ibs-cbs`**: full-rate IBS/CBS net of credits
//! - **POST `/v1/calc/ibs-cbs/compare`**: current ICMS + PIS/COFINS vs reform
//!
//! Numeric fields accept JSON numbers or Brazilian-formatted strings
//! (`"1.234,56"`). Rates left out of a DIFAL request are looked up in the
//! loaded rate table; an ICMS-ST request without `mva` takes the agreed
//! margin for its `ncm` and destination.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use fisco_core::numeric::{parse_optional, parse_required};
use fisco_core::{DecimalInput, Uf, ValidationError};
use fisco_engine::difal::Methodology;
use fisco_engine::{
    icms_st, Audited, DifalInput, DifalResult, EngineConfig, IcmsStInput, IcmsStResult,
    MethodComparison, MvaCatalog, MvaComparison, MvaLookup, OperationType, ReformComparison,
    ReformInput, ReformResult, TransitionResult, WithholdingInput, WithholdingResult,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_input, optional_uf, IntoInput};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// DIFAL request. Accepts the short legacy field names as aliases.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DifalRequest {
    /// Operation value.
    #[serde(alias = "valor")]
    #[schema(value_type = Option<f64>)]
    pub valor_operacao: Option<DecimalInput>,
    /// Interstate rate (%). Defaults to the rate between origin and destination.
    #[serde(alias = "aliqInter")]
    #[schema(value_type = Option<f64>)]
    pub aliquota_interestadual: Option<DecimalInput>,
    /// Destination internal rate (%). Defaults to the destination's rate.
    #[serde(alias = "aliqInterna")]
    #[schema(value_type = Option<f64>)]
    pub aliquota_interna: Option<DecimalInput>,
    /// FCP rate (%), default 0.
    #[serde(rename = "aliquotaFCP", alias = "aliqFCP")]
    #[schema(value_type = Option<f64>)]
    pub aliquota_fcp: Option<DecimalInput>,
    /// Destination UF, default `SP`.
    pub uf_destino: Option<String>,
    /// Origin UF.
    pub uf_origem: Option<String>,
    /// `base_dupla`, `base_unica` or `auto`.
    pub metodologia: Option<String>,
}

impl IntoInput for DifalRequest {
    type Input = DifalInput;

    fn into_input(self, config: &EngineConfig) -> Result<DifalInput, ValidationError> {
        let rates = &config.rates;
        let destino = optional_uf("ufDestino", self.uf_destino.as_deref())?.unwrap_or(Uf::Sp);
        let origem = optional_uf("ufOrigem", self.uf_origem.as_deref())?;
        let valor = parse_required("valorOperacao", self.valor_operacao.as_ref())?;
        let interestadual = match &self.aliquota_interestadual {
            Some(v) => v.parse("aliquotaInterestadual")?,
            None => rates.interstate_rate(origem, destino),
        };
        let interna = match &self.aliquota_interna {
            Some(v) => v.parse("aliquotaInterna")?,
            None => rates.internal_rate(destino),
        };
        let fcp = parse_optional("aliquotaFCP", self.aliquota_fcp.as_ref())?;
        let metodologia = match self.metodologia.as_deref() {
            Some(m) => Methodology::parse_selector("metodologia", m)?,
            None => None,
        };

        let mut input = DifalInput::new(valor, interestadual, interna, destino).with_fcp(fcp);
        input.metodologia = metodologia;
        input.uf_origem = origem;
        Ok(input)
    }
}

/// ICMS-ST request.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IcmsStRequest {
    /// Product value.
    #[schema(value_type = Option<f64>)]
    pub valor_produto: Option<DecimalInput>,
    /// IPI.
    #[schema(value_type = Option<f64>)]
    pub ipi: Option<DecimalInput>,
    /// Freight.
    #[schema(value_type = Option<f64>)]
    pub frete: Option<DecimalInput>,
    /// Insurance.
    #[schema(value_type = Option<f64>)]
    pub seguro: Option<DecimalInput>,
    /// Other expenses.
    #[schema(value_type = Option<f64>)]
    pub outras_despesas: Option<DecimalInput>,
    /// Discount.
    #[schema(value_type = Option<f64>)]
    pub desconto: Option<DecimalInput>,
    /// MVA (%). Defaults to the agreed margin for `ncm` into `ufDestino`.
    #[schema(value_type = Option<f64>)]
    pub mva: Option<DecimalInput>,
    /// Product NCM, used to look up the MVA when `mva` is left out.
    pub ncm: Option<String>,
    /// Original MVA (%), when `mva` is already adjusted.
    #[schema(value_type = Option<f64>)]
    pub mva_original: Option<DecimalInput>,
    /// Destination internal rate (%). Defaults to the destination's rate
    /// when `ufDestino` is given.
    #[serde(alias = "aliqInterna")]
    #[schema(value_type = Option<f64>)]
    pub aliquota_interna: Option<DecimalInput>,
    /// Interstate rate (%). Required by the MVA comparison.
    #[serde(alias = "aliqInter")]
    #[schema(value_type = Option<f64>)]
    pub aliquota_interestadual: Option<DecimalInput>,
    /// Origin UF.
    pub uf_origem: Option<String>,
    /// Destination UF.
    pub uf_destino: Option<String>,
}

impl IntoInput for IcmsStRequest {
    type Input = IcmsStInput;

    fn into_input(self, config: &EngineConfig) -> Result<IcmsStInput, ValidationError> {
        let uf_origem = optional_uf("ufOrigem", self.uf_origem.as_deref())?;
        let uf_destino = optional_uf("ufDestino", self.uf_destino.as_deref())?;
        let aliquota_interna = match (&self.aliquota_interna, uf_destino) {
            (Some(v), _) => v.parse("aliquotaInterna")?,
            (None, Some(uf)) => config.rates.internal_rate(uf),
            (None, None) => return Err(ValidationError::Missing { field: "aliquotaInterna" }),
        };
        let valor_produto = parse_required("valorProduto", self.valor_produto.as_ref())?;
        let ncm = self.ncm.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let mva = match (&self.mva, ncm, uf_destino) {
            (Some(v), _, _) => v.parse("mva")?,
            (None, Some(ncm), Some(uf)) => MvaCatalog::new(&config.mva, &config.rates)
                .margin(ncm, uf)?
                .ok_or(ValidationError::Missing { field: "mva" })?,
            (None, _, _) => return Err(ValidationError::Missing { field: "mva" }),
        };
        Ok(IcmsStInput {
            valor_produto,
            ipi: parse_optional("ipi", self.ipi.as_ref())?,
            frete: parse_optional("frete", self.frete.as_ref())?,
            seguro: parse_optional("seguro", self.seguro.as_ref())?,
            outras_despesas: parse_optional("outrasDespesas", self.outras_despesas.as_ref())?,
            desconto: parse_optional("desconto", self.desconto.as_ref())?,
            mva,
            mva_original: self
                .mva_original
                .as_ref()
                .map(|v| v.parse("mvaOriginal"))
                .transpose()?,
            aliquota_interna,
            aliquota_interestadual: self
                .aliquota_interestadual
                .as_ref()
                .map(|v| v.parse("aliquotaInterestadual"))
                .transpose()?,
            uf_origem,
            uf_destino,
        })
    }
}

/// MVA lookup request.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MvaRequest {
    /// 8-digit NCM; dots are ignored.
    pub ncm: Option<String>,
    /// Destination UF.
    pub uf_destino: Option<String>,
    /// Origin UF. Without it the standard interstate rate applies.
    pub uf_origem: Option<String>,
}

impl IntoInput for MvaRequest {
    /// NCM, destination and origin.
    type Input = (String, Uf, Option<Uf>);

    fn into_input(self, _config: &EngineConfig) -> Result<Self::Input, ValidationError> {
        let ncm = self
            .ncm
            .filter(|n| !n.trim().is_empty())
            .ok_or(ValidationError::Missing { field: "ncm" })?;
        let destino = optional_uf("ufDestino", self.uf_destino.as_deref())?
            .ok_or(ValidationError::Missing { field: "ufDestino" })?;
        let origem = optional_uf("ufOrigem", self.uf_origem.as_deref())?;
        Ok((ncm, destino, origem))
    }
}

/// Withholding request.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetencoesRequest {
    /// Gross service value.
    #[serde(alias = "valor")]
    #[schema(value_type = Option<f64>)]
    pub valor_servico: Option<DecimalInput>,
    /// Municipal service code, default `17.01`.
    pub tipo_servico: Option<String>,
    /// Taker CPF/CNPJ.
    #[serde(alias = "cpfCnpjPrestador")]
    pub cpf_cnpj_tomador: Option<String>,
}

impl IntoInput for RetencoesRequest {
    type Input = WithholdingInput;

    fn into_input(self, _config: &EngineConfig) -> Result<WithholdingInput, ValidationError> {
        let mut input =
            WithholdingInput::new(parse_required("valorServico", self.valor_servico.as_ref())?);
        if let Some(tipo) = self.tipo_servico.filter(|t| !t.trim().is_empty()) {
            input.tipo_servico = tipo;
        }
        input.cpf_cnpj_tomador = self.cpf_cnpj_tomador.filter(|d| !d.trim().is_empty());
        Ok(input)
    }
}

/// Transition request for one year.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransicaoRequest {
    /// Operation value.
    #[serde(alias = "valor")]
    #[schema(value_type = Option<f64>)]
    pub valor_operacao: Option<DecimalInput>,
    /// Calendar year. Defaults to the first scheduled year.
    pub ano: Option<i32>,
    /// `mercadoria` (default) or `servico`.
    pub tipo_operacao: Option<String>,
}

impl IntoInput for TransicaoRequest {
    /// Value, year and operation type.
    type Input = (f64, i32, OperationType);

    fn into_input(self, config: &EngineConfig) -> Result<Self::Input, ValidationError> {
        let valor = parse_required("valorOperacao", self.valor_operacao.as_ref())?;
        let ano = self
            .ano
            .unwrap_or_else(|| config.transition.schedule.first().ano);
        let tipo = operation_type(self.tipo_operacao.as_deref())?;
        Ok((valor, ano, tipo))
    }
}

/// Transition request sweeping every scheduled year.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransicaoCompareRequest {
    /// Operation value.
    #[serde(alias = "valor")]
    #[schema(value_type = Option<f64>)]
    pub valor_operacao: Option<DecimalInput>,
    /// `mercadoria` (default) or `servico`.
    pub tipo_operacao: Option<String>,
}

impl IntoInput for TransicaoCompareRequest {
    /// Value and operation type.
    type Input = (f64, OperationType);

    fn into_input(self, _config: &EngineConfig) -> Result<Self::Input, ValidationError> {
        let valor = parse_required("valorOperacao", self.valor_operacao.as_ref())?;
        Ok((valor, operation_type(self.tipo_operacao.as_deref())?))
    }
}

/// Full-rate IBS/CBS request. Accepts the short legacy field names.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IbsCbsRequest {
    /// Operation value.
    #[serde(alias = "valor")]
    #[schema(value_type = Option<f64>)]
    pub valor_operacao: Option<DecimalInput>,
    /// Free-form operation label, default `venda`.
    pub tipo_operacao: Option<String>,
    /// IBS rate (%). Defaults to the configured rate.
    #[serde(alias = "aliqIBS")]
    #[schema(value_type = Option<f64>)]
    pub aliquota_ibs: Option<DecimalInput>,
    /// CBS rate (%). Defaults to the configured rate.
    #[serde(alias = "aliqCBS")]
    #[schema(value_type = Option<f64>)]
    pub aliquota_cbs: Option<DecimalInput>,
    /// IBS credit on inputs.
    #[serde(alias = "creditoIBS")]
    #[schema(value_type = Option<f64>)]
    pub credito_ibs: Option<DecimalInput>,
    /// CBS credit on inputs.
    #[serde(alias = "creditoCBS")]
    #[schema(value_type = Option<f64>)]
    pub credito_cbs: Option<DecimalInput>,
}

impl IntoInput for IbsCbsRequest {
    type Input = ReformInput;

    fn into_input(self, _config: &EngineConfig) -> Result<ReformInput, ValidationError> {
        let mut input =
            ReformInput::new(parse_required("valorOperacao", self.valor_operacao.as_ref())?);
        if let Some(tipo) = self.tipo_operacao.filter(|t| !t.trim().is_empty()) {
            input.tipo_operacao = tipo;
        }
        input.aliquota_ibs = self.aliquota_ibs.as_ref().map(|v| v.parse("aliquotaIbs")).transpose()?;
        input.aliquota_cbs = self.aliquota_cbs.as_ref().map(|v| v.parse("aliquotaCbs")).transpose()?;
        input.credito_ibs = parse_optional("creditoIbs", self.credito_ibs.as_ref())?;
        input.credito_cbs = parse_optional("creditoCbs", self.credito_cbs.as_ref())?;
        Ok(input)
    }
}

fn operation_type(value: Option<&str>) -> Result<OperationType, ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => OperationType::parse_field("tipoOperacao", v),
        None => Ok(OperationType::default()),
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the calculator router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/calc/difal", post(difal))
        .route("/v1/calc/difal/compare", post(difal_compare))
        .route("/v1/calc/icms-st", post(icms_st_calc))
        .route("/v1/calc/icms-st/compare", post(icms_st_compare))
        .route("/v1/calc/mva", post(mva_lookup))
        .route("/v1/calc/retencoes", post(retencoes))
        .route("/v1/calc/transicao", post(transicao))
        .route("/v1/calc/transicao/compare", post(transicao_compare))
        .route("/v1/calc/ibs-cbs", post(ibs_cbs))
        .route("/v1/calc/ibs-cbs/compare", post(ibs_cbs_compare))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/calc/difal
#[utoipa::path(
    post,
    path = "/v1/calc/difal",
    request_body = DifalRequest,
    responses(
        (status = 200, description = "DIFAL with memory trail and fingerprint", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = ErrorBody),
    ),
    tag = "calc"
)]
async fn difal(
    State(state): State<AppState>,
    body: Result<Json<DifalRequest>, JsonRejection>,
) -> Result<Json<Audited<DifalResult>>, AppError> {
    let input = extract_input(body, state.engine.config())?;
    Ok(Json(state.engine.difal().calculate_with_memory(&input)?))
}

/// POST /v1/calc/difal/compare
#[utoipa::path(
    post,
    path = "/v1/calc/difal/compare",
    request_body = DifalRequest,
    responses(
        (status = 200, description = "Single-base and dual-base results side by side", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = ErrorBody),
    ),
    tag = "calc"
)]
async fn difal_compare(
    State(state): State<AppState>,
    body: Result<Json<DifalRequest>, JsonRejection>,
) -> Result<Json<MethodComparison>, AppError> {
    let input = extract_input(body, state.engine.config())?;
    Ok(Json(state.engine.difal().compare_methods(&input)?))
}

/// POST /v1/calc/icms-st
#[utoipa::path(
    post,
    path = "/v1/calc/icms-st",
    request_body = IcmsStRequest,
    responses(
        (status = 200, description = "ICMS-ST with memory trail and fingerprint", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = ErrorBody),
    ),
    tag = "calc"
)]
async fn icms_st_calc(
    State(state): State<AppState>,
    body: Result<Json<IcmsStRequest>, JsonRejection>,
) -> Result<Json<Audited<IcmsStResult>>, AppError> {
    let input = extract_input(body, state.engine.config())?;
    Ok(Json(icms_st::calculate_with_memory(&input)?))
}

/// POST /v1/calc/icms-st/compare
#[utoipa::path(
    post,
    path = "/v1/calc/icms-st/compare",
    request_body = IcmsStRequest,
    responses(
        (status = 200, description = "ST with original and adjusted MVA", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = ErrorBody),
    ),
    tag = "calc"
)]
async fn icms_st_compare(
    State(state): State<AppState>,
    body: Result<Json<IcmsStRequest>, JsonRejection>,
) -> Result<Json<MvaComparison>, AppError> {
    let input = extract_input(body, state.engine.config())?;
    Ok(Json(icms_st::compare_mva(&input)?))
}

/// POST /v1/calc/mva
#[utoipa::path(
    post,
    path = "/v1/calc/mva",
    request_body = MvaRequest,
    responses(
        (status = 200, description = "Agreed and adjusted MVA with memory trail and fingerprint", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = ErrorBody),
    ),
    tag = "calc"
)]
async fn mva_lookup(
    State(state): State<AppState>,
    body: Result<Json<MvaRequest>, JsonRejection>,
) -> Result<Json<Audited<MvaLookup>>, AppError> {
    let (ncm, destino, origem) = extract_input(body, state.engine.config())?;
    Ok(Json(state.engine.mva().lookup(&ncm, destino, origem)?))
}

/// POST /v1/calc/retencoes
#[utoipa::path(
    post,
    path = "/v1/calc/retencoes",
    request_body = RetencoesRequest,
    responses(
        (status = 200, description = "Withheld PIS, COFINS, CSLL and IRRF", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = ErrorBody),
    ),
    tag = "calc"
)]
async fn retencoes(
    State(state): State<AppState>,
    body: Result<Json<RetencoesRequest>, JsonRejection>,
) -> Result<Json<Audited<WithholdingResult>>, AppError> {
    let input = extract_input(body, state.engine.config())?;
    Ok(Json(state.engine.withholding().calculate_with_memory(&input)?))
}

/// POST /v1/calc/transicao
#[utoipa::path(
    post,
    path = "/v1/calc/transicao",
    request_body = TransicaoRequest,
    responses(
        (status = 200, description = "Tax burden for one transition year", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = ErrorBody),
    ),
    tag = "calc"
)]
async fn transicao(
    State(state): State<AppState>,
    body: Result<Json<TransicaoRequest>, JsonRejection>,
) -> Result<Json<Audited<TransitionResult>>, AppError> {
    let (valor, ano, tipo) = extract_input(body, state.engine.config())?;
    Ok(Json(state.engine.transition().calculate(valor, ano, tipo)?))
}

/// POST /v1/calc/transicao/compare
#[utoipa::path(
    post,
    path = "/v1/calc/transicao/compare",
    request_body = TransicaoCompareRequest,
    responses(
        (status = 200, description = "Tax burden per scheduled year", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = ErrorBody),
    ),
    tag = "calc"
)]
async fn transicao_compare(
    State(state): State<AppState>,
    body: Result<Json<TransicaoCompareRequest>, JsonRejection>,
) -> Result<Json<BTreeMap<i32, Audited<TransitionResult>>>, AppError> {
    let (valor, tipo) = extract_input(body, state.engine.config())?;
    Ok(Json(state.engine.transition().compare_years(valor, tipo)?))
}

/// POST /v1/calc/ibs-cbs
#[utoipa::path(
    post,
    path = "/v1/calc/ibs-cbs",
    request_body = IbsCbsRequest,
    responses(
        (status = 200, description = "Full-rate IBS/CBS with memory trail and fingerprint", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = ErrorBody),
    ),
    tag = "calc"
)]
async fn ibs_cbs(
    State(state): State<AppState>,
    body: Result<Json<IbsCbsRequest>, JsonRejection>,
) -> Result<Json<Audited<ReformResult>>, AppError> {
    let input = extract_input(body, state.engine.config())?;
    Ok(Json(state.engine.transition().reform(&input)?))
}

/// POST /v1/calc/ibs-cbs/compare
#[utoipa::path(
    post,
    path = "/v1/calc/ibs-cbs/compare",
    request_body = IbsCbsRequest,
    responses(
        (status = 200, description = "Current ICMS + PIS/COFINS against IBS/CBS", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = ErrorBody),
    ),
    tag = "calc"
)]
async fn ibs_cbs_compare(
    State(state): State<AppState>,
    body: Result<Json<IbsCbsRequest>, JsonRejection>,
) -> Result<Json<ReformComparison>, AppError> {
    let input = extract_input(body, state.engine.config())?;
    Ok(Json(state.engine.transition().compare_current_vs_reform(&input)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn difal_request_accepts_legacy_names() {
        let req: DifalRequest = serde_json::from_value(serde_json::json!({
            "valor": "1.000,00",
            "aliqInter": 12,
            "aliqInterna": "17",
            "aliqFCP": 2,
            "ufDestino": "rj",
            "metodologia": "auto"
        }))
        .unwrap();
        let input = req.into_input(&config()).unwrap();
        assert_eq!(input.valor_operacao, 1000.0);
        assert_eq!(input.aliquota_interestadual, 12.0);
        assert_eq!(input.aliquota_interna, 17.0);
        assert_eq!(input.aliquota_fcp, 2.0);
        assert_eq!(input.uf_destino, Uf::Rj);
        assert_eq!(input.metodologia, None);
    }

    #[test]
    fn difal_request_fills_rates_from_table() {
        let req = DifalRequest {
            valor_operacao: Some(1000.0.into()),
            uf_origem: Some("SP".into()),
            uf_destino: Some("BA".into()),
            ..DifalRequest::default()
        };
        let rates = config().rates;
        let input = req.into_input(&config()).unwrap();
        assert_eq!(input.uf_destino, Uf::Ba);
        assert_eq!(input.aliquota_interestadual, rates.interstate_rate(Some(Uf::Sp), Uf::Ba));
        assert_eq!(input.aliquota_interna, rates.internal_rate(Uf::Ba));
        assert_eq!(input.aliquota_fcp, 0.0);
    }

    #[test]
    fn difal_request_without_origin_uses_standard_interstate_rate() {
        let req = DifalRequest {
            valor_operacao: Some(1000.0.into()),
            uf_destino: Some("BA".into()),
            ..DifalRequest::default()
        };
        let input = req.into_input(&config()).unwrap();
        assert_eq!(input.uf_origem, None);
        assert_eq!(input.aliquota_interestadual, 12.0);
    }

    #[test]
    fn difal_request_defaults_destination_to_sp() {
        let req = DifalRequest {
            valor_operacao: Some(100.0.into()),
            ..DifalRequest::default()
        };
        assert_eq!(req.into_input(&config()).unwrap().uf_destino, Uf::Sp);
    }

    #[test]
    fn difal_request_names_bad_fields() {
        let missing = DifalRequest::default().into_input(&config()).unwrap_err();
        assert_eq!(missing.field(), "valorOperacao");

        let bad_uf = DifalRequest {
            valor_operacao: Some(100.0.into()),
            uf_destino: Some("ZZ".into()),
            ..DifalRequest::default()
        };
        assert_eq!(bad_uf.into_input(&config()).unwrap_err().field(), "ufDestino");

        let bad_method = DifalRequest {
            valor_operacao: Some(100.0.into()),
            metodologia: Some("base_tripla".into()),
            ..DifalRequest::default()
        };
        assert_eq!(bad_method.into_input(&config()).unwrap_err().field(), "metodologia");

        let text = DifalRequest {
            valor_operacao: Some("abc".into()),
            ..DifalRequest::default()
        };
        assert_eq!(text.into_input(&config()).unwrap_err().field(), "valorOperacao");
    }

    #[test]
    fn icms_st_request_requires_internal_rate_or_destination() {
        let req = IcmsStRequest {
            valor_produto: Some(1000.0.into()),
            mva: Some(40.0.into()),
            ..IcmsStRequest::default()
        };
        assert_eq!(req.into_input(&config()).unwrap_err().field(), "aliquotaInterna");

        let req = IcmsStRequest {
            valor_produto: Some(1000.0.into()),
            mva: Some(40.0.into()),
            uf_destino: Some("MG".into()),
            ..IcmsStRequest::default()
        };
        let input = req.into_input(&config()).unwrap();
        assert_eq!(input.aliquota_interna, config().rates.internal_rate(Uf::Mg));
        assert_eq!(input.uf_destino, Some(Uf::Mg));
    }

    #[test]
    fn icms_st_request_takes_mva_from_ncm() {
        let req = IcmsStRequest {
            valor_produto: Some(1000.0.into()),
            ncm: Some("4011.10.00".into()),
            uf_destino: Some("BA".into()),
            ..IcmsStRequest::default()
        };
        assert_eq!(req.into_input(&config()).unwrap().mva, 45.0);

        let explicit = IcmsStRequest {
            valor_produto: Some(1000.0.into()),
            mva: Some(40.0.into()),
            ncm: Some("40111000".into()),
            uf_destino: Some("BA".into()),
            ..IcmsStRequest::default()
        };
        assert_eq!(explicit.into_input(&config()).unwrap().mva, 40.0);

        let unlisted = IcmsStRequest {
            valor_produto: Some(1000.0.into()),
            ncm: Some("99999999".into()),
            uf_destino: Some("BA".into()),
            ..IcmsStRequest::default()
        };
        assert_eq!(unlisted.into_input(&config()).unwrap_err().field(), "mva");

        let malformed = IcmsStRequest {
            valor_produto: Some(1000.0.into()),
            ncm: Some("4011".into()),
            uf_destino: Some("BA".into()),
            ..IcmsStRequest::default()
        };
        assert_eq!(malformed.into_input(&config()).unwrap_err().field(), "ncm");
    }

    #[test]
    fn mva_request_requires_ncm_and_destination() {
        let missing = MvaRequest {
            uf_destino: Some("BA".into()),
            ..MvaRequest::default()
        };
        assert_eq!(missing.into_input(&config()).unwrap_err().field(), "ncm");

        let no_dest = MvaRequest {
            ncm: Some("40111000".into()),
            ..MvaRequest::default()
        };
        assert_eq!(no_dest.into_input(&config()).unwrap_err().field(), "ufDestino");

        let ok = MvaRequest {
            ncm: Some("40111000".into()),
            uf_destino: Some("ba".into()),
            uf_origem: Some("SP".into()),
        };
        let (ncm, destino, origem) = ok.into_input(&config()).unwrap();
        assert_eq!(ncm, "40111000");
        assert_eq!(destino, Uf::Ba);
        assert_eq!(origem, Some(Uf::Sp));
    }

    #[test]
    fn ibs_cbs_request_accepts_legacy_names() {
        let req: IbsCbsRequest = serde_json::from_value(serde_json::json!({
            "valor": "1.000,00",
            "tipoOperacao": "",
            "aliqIBS": 18,
            "creditoCBS": "10,50"
        }))
        .unwrap();
        let input = req.into_input(&config()).unwrap();
        assert_eq!(input.valor_operacao, 1000.0);
        assert_eq!(input.tipo_operacao, "venda");
        assert_eq!(input.aliquota_ibs, Some(18.0));
        assert_eq!(input.aliquota_cbs, None);
        assert_eq!(input.credito_cbs, 10.5);
        assert_eq!(input.credito_ibs, 0.0);
    }

    #[test]
    fn retencoes_request_defaults() {
        let req: RetencoesRequest = serde_json::from_value(serde_json::json!({
            "valorServico": 1000,
            "tipoServico": "",
            "cpfCnpjPrestador": "12345678000199"
        }))
        .unwrap();
        let input = req.into_input(&config()).unwrap();
        assert_eq!(input.tipo_servico, "17.01");
        assert_eq!(input.cpf_cnpj_tomador.as_deref(), Some("12345678000199"));
    }

    #[test]
    fn transicao_request_defaults_year_and_type() {
        let req = TransicaoRequest {
            valor_operacao: Some(1000.0.into()),
            ..TransicaoRequest::default()
        };
        let (valor, ano, tipo) = req.into_input(&config()).unwrap();
        assert_eq!(valor, 1000.0);
        assert_eq!(ano, 2026);
        assert_eq!(tipo, OperationType::Mercadoria);

        let bad = TransicaoCompareRequest {
            valor_operacao: Some(1000.0.into()),
            tipo_operacao: Some("imovel".into()),
        };
        assert_eq!(bad.into_input(&config()).unwrap_err().field(), "tipoOperacao");
    }
}
