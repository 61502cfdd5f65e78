//! # DIFAL: ICMS Rate Differential
//!
//! Computes the ICMS owed to the destination state on interstate sales to
//! final consumers.
//!
//! ## Methodologies
//!
//! - **Dual base** (LC 190/2022, the default). The origin ICMS is removed
//!   from the operation value and the net is grossed up by the destination
//!   internal rate only: `base = (v − v·inter) / (1 − interna)`. The FCP rate
//!   is applied to the grossed base but never enters the gross-up
//!   denominator.
//! - **Single base** (EC 87/2015). `difal = v · (interna − inter)`, no
//!   gross-up.
//!
//! The default methodology for a destination comes from the injected
//! [`RateTable`] mapping (Espírito Santo keeps the single base).
//!
//! All arithmetic runs at full precision; the returned record is rounded to
//! the cent as a final pass.

use fisco_core::numeric::{below, format_brl, format_rate, non_negative, round2};
use fisco_core::{CalculationError, CanonicalInput, FingerprintDomain, MemoryTrail, Uf, ValidationError};
use serde::{Deserialize, Serialize};

use crate::audit::Audited;
use crate::config::RateTable;
use crate::ensure_finite;

/// DIFAL calculation methodology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Methodology {
    /// Gross-up over the net value (LC 190/2022).
    BaseDupla,
    /// Rate difference over the operation value (EC 87/2015).
    BaseUnica,
}

impl Methodology {
    /// Return the string representation of this methodology.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BaseDupla => "base_dupla",
            Self::BaseUnica => "base_unica",
        }
    }

    /// Statutory basis.
    pub fn legal_basis(&self) -> &'static str {
        match self {
            Self::BaseDupla => "LC 190/2022",
            Self::BaseUnica => "EC 87/2015",
        }
    }

    /// Return all methodology variants.
    pub fn all() -> &'static [Methodology] {
        &[Self::BaseDupla, Self::BaseUnica]
    }

    /// Parse a methodology selector. `"auto"` and the empty string mean
    /// "use the destination default" and yield `None`.
    pub fn parse_selector(
        field: &'static str,
        value: &str,
    ) -> Result<Option<Methodology>, ValidationError> {
        let v = value.trim();
        if v.is_empty() || v.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        Self::all()
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(v))
            .map(Some)
            .ok_or_else(|| ValidationError::UnknownValue {
                field,
                value: value.to_string(),
            })
    }
}

impl std::fmt::Display for Methodology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized DIFAL input. Rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifalInput {
    /// Operation value.
    pub valor_operacao: f64,
    /// Interstate ICMS rate (%).
    pub aliquota_interestadual: f64,
    /// Destination-internal ICMS rate (%).
    pub aliquota_interna: f64,
    /// Destination FCP rate (%).
    pub aliquota_fcp: f64,
    /// Explicit methodology; `None` uses the destination default.
    pub metodologia: Option<Methodology>,
    /// Destination UF.
    pub uf_destino: Uf,
    /// Origin UF, informational.
    pub uf_origem: Option<Uf>,
}

impl DifalInput {
    /// Input with no FCP, default methodology, and unknown origin.
    pub fn new(
        valor_operacao: f64,
        aliquota_interestadual: f64,
        aliquota_interna: f64,
        uf_destino: Uf,
    ) -> Self {
        Self {
            valor_operacao,
            aliquota_interestadual,
            aliquota_interna,
            aliquota_fcp: 0.0,
            metodologia: None,
            uf_destino,
            uf_origem: None,
        }
    }

    /// Set the FCP rate.
    pub fn with_fcp(mut self, aliquota_fcp: f64) -> Self {
        self.aliquota_fcp = aliquota_fcp;
        self
    }

    /// Force a methodology.
    pub fn with_methodology(mut self, metodologia: Methodology) -> Self {
        self.metodologia = Some(metodologia);
        self
    }

    /// Record the origin UF.
    pub fn with_origin(mut self, uf_origem: Uf) -> Self {
        self.uf_origem = Some(uf_origem);
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        non_negative("valorOperacao", self.valor_operacao)?;
        non_negative("aliquotaInterestadual", self.aliquota_interestadual)?;
        non_negative("aliquotaInterna", self.aliquota_interna)?;
        non_negative("aliquotaFCP", self.aliquota_fcp)?;
        below("aliquotaInterestadual", self.aliquota_interestadual, 100.0)?;
        below("aliquotaInterna", self.aliquota_interna, 100.0)?;
        below("aliquotaFCP", self.aliquota_fcp, 100.0)?;
        Ok(())
    }

    fn canonical(&self) -> CanonicalInput {
        CanonicalInput::builder()
            .amount(self.valor_operacao)
            .text_or(self.uf_origem.as_ref().map(Uf::as_str), "")
            .text(self.uf_destino.as_str())
            .amount(self.aliquota_interestadual)
            .amount(self.aliquota_interna)
            .amount(self.aliquota_fcp)
            .text_or(self.metodologia.as_ref().map(Methodology::as_str), "auto")
            .finish()
    }
}

/// DIFAL result. Dual-base-only and single-base-only fields are omitted
/// from JSON when not applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifalResult {
    /// Methodology applied.
    pub metodologia: Methodology,
    /// Destination UF.
    pub uf_destino: Uf,
    /// Origin UF.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uf_origem: Option<Uf>,
    /// Operation value.
    pub valor_operacao: f64,
    /// Interstate rate (%).
    pub aliquota_interestadual: f64,
    /// Internal rate (%).
    pub aliquota_interna: f64,
    /// FCP rate (%).
    #[serde(rename = "aliquotaFCP")]
    pub aliquota_fcp: f64,
    /// Calculation base (single base only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_calculo: Option<f64>,
    /// ICMS due to the origin state.
    pub icms_origem: f64,
    /// Operation value net of origin ICMS (dual base only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valor_liquido: Option<f64>,
    /// Grossed-up base (dual base only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_majorada: Option<f64>,
    /// ICMS at the destination internal rate.
    pub icms_destino: f64,
    /// FCP amount.
    pub fcp: f64,
    /// Rate differential owed to the destination.
    pub difal: f64,
    /// DIFAL plus FCP.
    pub total_difal: f64,
}

impl DifalResult {
    fn rounded(self) -> Self {
        let r = |v: Option<f64>| v.map(round2);
        Self {
            valor_operacao: round2(self.valor_operacao),
            aliquota_interestadual: round2(self.aliquota_interestadual),
            aliquota_interna: round2(self.aliquota_interna),
            aliquota_fcp: round2(self.aliquota_fcp),
            base_calculo: r(self.base_calculo),
            icms_origem: round2(self.icms_origem),
            valor_liquido: r(self.valor_liquido),
            base_majorada: r(self.base_majorada),
            icms_destino: round2(self.icms_destino),
            fcp: round2(self.fcp),
            difal: round2(self.difal),
            total_difal: round2(self.total_difal),
            ..self
        }
    }

    fn numbers(&self) -> Vec<f64> {
        [
            Some(self.icms_origem),
            self.valor_liquido,
            self.base_majorada,
            Some(self.icms_destino),
            Some(self.fcp),
            Some(self.difal),
            Some(self.total_difal),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Side-by-side result of both methodologies on the same input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodComparison {
    /// Single-base result.
    pub base_unica: DifalResult,
    /// Dual-base result.
    pub base_dupla: DifalResult,
    /// Dual-base total minus single-base total.
    pub diferenca: f64,
    /// `diferenca` relative to the single-base total (%), zero when that
    /// total is zero.
    pub diferenca_percentual: f64,
}

/// DIFAL calculator bound to a rate table.
#[derive(Debug, Clone, Copy)]
pub struct DifalCalculator<'a> {
    rates: &'a RateTable,
}

impl<'a> DifalCalculator<'a> {
    /// Create a calculator reading defaults from `rates`.
    pub fn new(rates: &'a RateTable) -> Self {
        Self { rates }
    }

    /// Methodology that applies to `input`.
    pub fn methodology_for(&self, input: &DifalInput) -> Methodology {
        input
            .metodologia
            .unwrap_or_else(|| self.rates.default_methodology(input.uf_destino))
    }

    /// Compute the DIFAL.
    pub fn calculate(&self, input: &DifalInput) -> Result<DifalResult, CalculationError> {
        let method = self.methodology_for(input);
        self.calculate_as(input, method, None)
    }

    /// Compute the DIFAL and seal it with memory trail and fingerprint.
    pub fn calculate_with_memory(
        &self,
        input: &DifalInput,
    ) -> Result<Audited<DifalResult>, CalculationError> {
        let method = self.methodology_for(input);
        let mut memoria = MemoryTrail::new();
        let resultado = self.calculate_as(input, method, Some(&mut memoria))?;
        Ok(Audited::seal(
            resultado,
            memoria,
            FingerprintDomain::Difal,
            &input.canonical(),
            method.legal_basis(),
        ))
    }

    /// Run both methodologies on the same input.
    pub fn compare_methods(&self, input: &DifalInput) -> Result<MethodComparison, CalculationError> {
        let base_unica = self.compute(input, Methodology::BaseUnica, None)?;
        let base_dupla = self.compute(input, Methodology::BaseDupla, None)?;
        let diferenca = base_dupla.total_difal - base_unica.total_difal;
        let diferenca_percentual = if base_unica.total_difal != 0.0 {
            diferenca / base_unica.total_difal * 100.0
        } else {
            0.0
        };
        Ok(MethodComparison {
            base_unica: base_unica.rounded(),
            base_dupla: base_dupla.rounded(),
            diferenca: round2(diferenca),
            diferenca_percentual: round2(diferenca_percentual),
        })
    }

    fn calculate_as(
        &self,
        input: &DifalInput,
        method: Methodology,
        memoria: Option<&mut MemoryTrail>,
    ) -> Result<DifalResult, CalculationError> {
        self.compute(input, method, memoria).map(DifalResult::rounded)
    }

    /// Unrounded result.
    fn compute(
        &self,
        input: &DifalInput,
        method: Methodology,
        memoria: Option<&mut MemoryTrail>,
    ) -> Result<DifalResult, CalculationError> {
        input.validate()?;
        tracing::debug!(
            uf_destino = %input.uf_destino,
            metodologia = %method,
            valor = input.valor_operacao,
            "calculating DIFAL"
        );

        let mut scratch = MemoryTrail::new();
        let trail = memoria.unwrap_or(&mut scratch);
        let raw = match method {
            Methodology::BaseUnica => single_base(input, trail),
            Methodology::BaseDupla => dual_base(input, trail),
        };
        ensure_finite("DIFAL", &raw.numbers())?;
        Ok(raw)
    }
}

fn single_base(input: &DifalInput, trail: &mut MemoryTrail) -> DifalResult {
    let v = input.valor_operacao;
    let inter = input.aliquota_interestadual / 100.0;
    let interna = input.aliquota_interna / 100.0;
    let fcp_rate = input.aliquota_fcp / 100.0;

    let icms_origem = v * inter;
    let icms_destino = v * interna;
    let difal = v * (interna - inter);
    let fcp = v * fcp_rate;
    let total_difal = difal + fcp;

    trail
        .record("Base de cálculo", "Valor da operação", format_brl(v))
        .record(
            "ICMS origem",
            format!("{} × {}", format_brl(v), format_rate(input.aliquota_interestadual)),
            format_brl(icms_origem),
        )
        .record(
            "ICMS destino",
            format!("{} × {}", format_brl(v), format_rate(input.aliquota_interna)),
            format_brl(icms_destino),
        )
        .record(
            "DIFAL",
            format!(
                "{} × ({} − {})",
                format_brl(v),
                format_rate(input.aliquota_interna),
                format_rate(input.aliquota_interestadual)
            ),
            format_brl(difal),
        );
    if fcp > 0.0 {
        trail.record(
            "FCP",
            format!("{} × {}", format_brl(v), format_rate(input.aliquota_fcp)),
            format_brl(fcp),
        );
    }
    trail.record(
        "Total DIFAL + FCP",
        format!("{} + {}", format_brl(difal), format_brl(fcp)),
        format_brl(total_difal),
    );

    DifalResult {
        metodologia: Methodology::BaseUnica,
        uf_destino: input.uf_destino,
        uf_origem: input.uf_origem,
        valor_operacao: v,
        aliquota_interestadual: input.aliquota_interestadual,
        aliquota_interna: input.aliquota_interna,
        aliquota_fcp: input.aliquota_fcp,
        base_calculo: Some(v),
        icms_origem,
        valor_liquido: None,
        base_majorada: None,
        icms_destino,
        fcp,
        difal,
        total_difal,
    }
}

fn dual_base(input: &DifalInput, trail: &mut MemoryTrail) -> DifalResult {
    let v = input.valor_operacao;
    let inter = input.aliquota_interestadual / 100.0;
    let interna = input.aliquota_interna / 100.0;
    let fcp_rate = input.aliquota_fcp / 100.0;

    let icms_origem = v * inter;
    let valor_liquido = v - icms_origem;
    // FCP stays out of the denominator.
    let base_majorada = valor_liquido / (1.0 - interna);
    let icms_destino = base_majorada * interna;
    let fcp = base_majorada * fcp_rate;
    let difal = icms_destino - icms_origem;
    let total_difal = difal + fcp;

    trail
        .record(
            "ICMS interestadual (origem)",
            format!("{} × {}", format_brl(v), format_rate(input.aliquota_interestadual)),
            format_brl(icms_origem),
        )
        .record(
            "Valor líquido (sem ICMS origem)",
            format!("{} − {}", format_brl(v), format_brl(icms_origem)),
            format_brl(valor_liquido),
        )
        .record(
            "Base majorada (gross-up)",
            format!(
                "{} ÷ (1 − {})",
                format_brl(valor_liquido),
                format_rate(input.aliquota_interna)
            ),
            format_brl(base_majorada),
        )
        .record(
            "ICMS interno (destino)",
            format!(
                "{} × {}",
                format_brl(base_majorada),
                format_rate(input.aliquota_interna)
            ),
            format_brl(icms_destino),
        );
    if fcp > 0.0 {
        trail.record(
            "FCP",
            format!("{} × {}", format_brl(base_majorada), format_rate(input.aliquota_fcp)),
            format_brl(fcp),
        );
    }
    trail
        .record(
            "DIFAL",
            format!("{} − {}", format_brl(icms_destino), format_brl(icms_origem)),
            format_brl(difal),
        )
        .record(
            "Total DIFAL + FCP",
            format!("{} + {}", format_brl(difal), format_brl(fcp)),
            format_brl(total_difal),
        );

    DifalResult {
        metodologia: Methodology::BaseDupla,
        uf_destino: input.uf_destino,
        uf_origem: input.uf_origem,
        valor_operacao: v,
        aliquota_interestadual: input.aliquota_interestadual,
        aliquota_interna: input.aliquota_interna,
        aliquota_fcp: input.aliquota_fcp,
        base_calculo: None,
        icms_origem,
        valor_liquido: Some(valor_liquido),
        base_majorada: Some(base_majorada),
        icms_destino,
        fcp,
        difal,
        total_difal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc() -> (RateTable, DifalInput) {
        (
            RateTable::default(),
            DifalInput::new(1000.0, 12.0, 17.0, Uf::Sp),
        )
    }

    #[test]
    fn dual_base_reference_values() {
        let (rates, input) = calc();
        let r = DifalCalculator::new(&rates)
            .calculate(&input.with_methodology(Methodology::BaseDupla))
            .unwrap();
        assert_eq!(r.metodologia, Methodology::BaseDupla);
        assert_eq!(r.icms_origem, 120.00);
        assert_eq!(r.valor_liquido, Some(880.00));
        assert_eq!(r.base_majorada, Some(1060.24));
        assert_eq!(r.icms_destino, 180.24);
        assert_eq!(r.difal, 60.24);
        assert_eq!(r.fcp, 0.0);
        assert_eq!(r.total_difal, 60.24);
        assert_eq!(r.base_calculo, None);
    }

    #[test]
    fn single_base_reference_values() {
        let (rates, input) = calc();
        let r = DifalCalculator::new(&rates)
            .calculate(&input.with_methodology(Methodology::BaseUnica))
            .unwrap();
        assert_eq!(r.difal, 50.00);
        assert_eq!(r.icms_origem, 120.00);
        assert_eq!(r.icms_destino, 170.00);
        assert_eq!(r.base_calculo, Some(1000.00));
        assert_eq!(r.valor_liquido, None);
        assert_eq!(r.base_majorada, None);
    }

    #[test]
    fn fcp_is_excluded_from_gross_up_denominator() {
        let rates = RateTable::default();
        let input = DifalInput::new(1000.0, 12.0, 17.0, Uf::Rj)
            .with_fcp(2.0)
            .with_methodology(Methodology::BaseDupla);
        let r = DifalCalculator::new(&rates).calculate(&input).unwrap();
        // Same base as without FCP.
        assert_eq!(r.base_majorada, Some(1060.24));
        assert_eq!(r.fcp, 21.2);
        assert_eq!(r.difal, 60.24);
        assert_eq!(r.total_difal, 81.45);
    }

    #[test]
    fn single_base_fcp_on_operation_value() {
        let rates = RateTable::default();
        let input = DifalInput::new(1000.0, 12.0, 17.0, Uf::Es).with_fcp(2.0);
        let r = DifalCalculator::new(&rates).calculate(&input).unwrap();
        assert_eq!(r.metodologia, Methodology::BaseUnica);
        assert_eq!(r.fcp, 20.0);
        assert_eq!(r.total_difal, 70.0);
    }

    #[test]
    fn default_methodology_follows_destination() {
        let rates = RateTable::default();
        let calc = DifalCalculator::new(&rates);
        let es = calc.calculate(&DifalInput::new(1000.0, 12.0, 17.0, Uf::Es)).unwrap();
        let sp = calc.calculate(&DifalInput::new(1000.0, 12.0, 17.0, Uf::Sp)).unwrap();
        assert_eq!(es.metodologia, Methodology::BaseUnica);
        assert_eq!(sp.metodologia, Methodology::BaseDupla);
    }

    #[test]
    fn injected_table_changes_default() {
        let mut rates = RateTable::default();
        rates.methodology.clear();
        let r = DifalCalculator::new(&rates)
            .calculate(&DifalInput::new(1000.0, 12.0, 17.0, Uf::Es))
            .unwrap();
        assert_eq!(r.metodologia, Methodology::BaseDupla);
    }

    #[test]
    fn explicit_methodology_overrides_default() {
        let rates = RateTable::default();
        let input = DifalInput::new(1000.0, 12.0, 17.0, Uf::Es).with_methodology(Methodology::BaseDupla);
        let r = DifalCalculator::new(&rates).calculate(&input).unwrap();
        assert_eq!(r.metodologia, Methodology::BaseDupla);
    }

    #[test]
    fn internal_rate_of_one_hundred_is_rejected() {
        let rates = RateTable::default();
        let input = DifalInput::new(1000.0, 12.0, 100.0, Uf::Sp);
        let err = DifalCalculator::new(&rates).calculate(&input).unwrap_err();
        assert_eq!(err.field(), Some("aliquotaInterna"));
    }

    #[test]
    fn negative_value_is_rejected_with_field() {
        let rates = RateTable::default();
        let input = DifalInput::new(-1.0, 12.0, 17.0, Uf::Sp);
        let err = DifalCalculator::new(&rates).calculate(&input).unwrap_err();
        assert_eq!(err.field(), Some("valorOperacao"));
    }

    #[test]
    fn nan_is_rejected() {
        let rates = RateTable::default();
        let input = DifalInput::new(1000.0, f64::NAN, 17.0, Uf::Sp);
        let err = DifalCalculator::new(&rates).calculate(&input).unwrap_err();
        assert_eq!(err.field(), Some("aliquotaInterestadual"));
    }

    #[test]
    fn zero_rates_are_allowed() {
        let rates = RateTable::default();
        let r = DifalCalculator::new(&rates)
            .calculate(&DifalInput::new(1000.0, 0.0, 0.0, Uf::Sp))
            .unwrap();
        assert_eq!(r.total_difal, 0.0);
    }

    #[test]
    fn memory_trail_dual_base() {
        let (rates, input) = calc();
        let audited = DifalCalculator::new(&rates)
            .calculate_with_memory(&input)
            .unwrap();
        let steps = audited.memoria.steps();
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0].result, "R$ 120.00");
        assert_eq!(steps[2].result, "R$ 1060.24");
        assert_eq!(steps[4].description, "DIFAL");
        assert_eq!(steps[4].result, "R$ 60.24");
        assert_eq!(audited.base_legal, "LC 190/2022");
        assert_eq!(audited.hash.as_str(), "DIFAL-A9C80EE46D7DC");
    }

    #[test]
    fn memory_trail_single_base_with_fcp() {
        let rates = RateTable::default();
        let input = DifalInput::new(1000.0, 12.0, 17.0, Uf::Es).with_fcp(1.0);
        let audited = DifalCalculator::new(&rates)
            .calculate_with_memory(&input)
            .unwrap();
        let descriptions: Vec<&str> = audited
            .memoria
            .steps()
            .iter()
            .map(|s| s.description.as_str())
            .collect();
        assert_eq!(
            descriptions,
            vec!["Base de cálculo", "ICMS origem", "ICMS destino", "DIFAL", "FCP", "Total DIFAL + FCP"]
        );
        assert_eq!(audited.base_legal, "EC 87/2015");
    }

    #[test]
    fn fingerprint_tracks_inputs() {
        let rates = RateTable::default();
        let calc = DifalCalculator::new(&rates);
        let a = calc.calculate_with_memory(&DifalInput::new(1000.0, 12.0, 17.0, Uf::Sp)).unwrap();
        let b = calc.calculate_with_memory(&DifalInput::new(1000.0, 12.0, 17.0, Uf::Sp)).unwrap();
        let c = calc.calculate_with_memory(&DifalInput::new(1000.0, 12.0, 18.0, Uf::Sp)).unwrap();
        let d = calc
            .calculate_with_memory(&DifalInput::new(1000.0, 12.0, 17.0, Uf::Sp).with_origin(Uf::Pr))
            .unwrap();
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
        assert_ne!(a.hash, d.hash);
    }

    #[test]
    fn compare_methods_reports_difference() {
        let (rates, input) = calc();
        let cmp = DifalCalculator::new(&rates).compare_methods(&input).unwrap();
        assert_eq!(cmp.base_unica.total_difal, 50.0);
        assert_eq!(cmp.base_dupla.total_difal, 60.24);
        assert_eq!(cmp.diferenca, 10.24);
        // 10.2439… / 50 = 20.4878…%
        assert_eq!(cmp.diferenca_percentual, 20.49);
    }

    #[test]
    fn compare_methods_subtracts_unrounded_totals() {
        let rates = RateTable::default();
        let input = DifalInput::new(100.74, 4.0, 19.0, Uf::Sp);
        let cmp = DifalCalculator::new(&rates).compare_methods(&input).unwrap();
        // 15.111 and 18.6555…: the rounded totals differ by 3.55, the
        // exact ones by 3.5445…
        assert_eq!(cmp.base_unica.total_difal, 15.11);
        assert_eq!(cmp.base_dupla.total_difal, 18.66);
        assert_eq!(cmp.diferenca, 3.54);
        assert_eq!(cmp.diferenca_percentual, 23.46);
    }

    #[test]
    fn compare_methods_zero_single_total() {
        let rates = RateTable::default();
        let input = DifalInput::new(1000.0, 17.0, 17.0, Uf::Sp);
        let cmp = DifalCalculator::new(&rates).compare_methods(&input).unwrap();
        assert_eq!(cmp.base_unica.total_difal, 0.0);
        assert_eq!(cmp.diferenca_percentual, 0.0);
    }

    #[test]
    fn result_serializes_camel_case_and_omits_inapplicable() {
        let (rates, input) = calc();
        let r = DifalCalculator::new(&rates).calculate(&input).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["metodologia"], "base_dupla");
        assert_eq!(json["ufDestino"], "SP");
        assert_eq!(json["baseMajorada"], 1060.24);
        assert_eq!(json["totalDifal"], 60.24);
        assert_eq!(json["aliquotaFCP"], 0.0);
        assert!(json.get("baseCalculo").is_none());
        assert!(json.get("ufOrigem").is_none());
    }

    #[test]
    fn methodology_selector_parsing() {
        assert_eq!(Methodology::parse_selector("metodologia", "auto").unwrap(), None);
        assert_eq!(Methodology::parse_selector("metodologia", "").unwrap(), None);
        assert_eq!(
            Methodology::parse_selector("metodologia", "BASE_UNICA").unwrap(),
            Some(Methodology::BaseUnica)
        );
        let err = Methodology::parse_selector("metodologia", "triple").unwrap_err();
        assert_eq!(err.field(), "metodologia");
    }
}
