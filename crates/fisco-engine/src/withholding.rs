//! # Federal Withholding on Services
//!
//! PIS, COFINS, CSLL and IRRF withheld at source by the service taker.
//! Each component is computed independently on the gross service value
//! with the rates from [`WithholdingRates`]. IRRF uses the flat simplified
//! rate.
//!
//! Totals are summed before rounding; each item and each aggregate is
//! then rounded on its own, so the rounded items need not add up to the
//! rounded total.

use fisco_core::numeric::{format_brl, format_rate, positive, round2};
use fisco_core::{CalculationError, CanonicalInput, FingerprintDomain, MemoryTrail};
use serde::{Deserialize, Serialize};

use crate::audit::Audited;
use crate::config::{WithholdingRate, WithholdingRates};
use crate::ensure_finite;

/// Default municipal service code.
pub const DEFAULT_SERVICE_CODE: &str = "17.01";

/// Withholding input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithholdingInput {
    /// Gross service value.
    pub valor_servico: f64,
    /// Service code, informational.
    pub tipo_servico: String,
    /// Taker document, informational.
    pub cpf_cnpj_tomador: Option<String>,
}

impl WithholdingInput {
    /// Input with the default service code and no taker document.
    pub fn new(valor_servico: f64) -> Self {
        Self {
            valor_servico,
            tipo_servico: DEFAULT_SERVICE_CODE.to_string(),
            cpf_cnpj_tomador: None,
        }
    }

    fn canonical(&self) -> CanonicalInput {
        CanonicalInput::builder()
            .amount(self.valor_servico)
            .text(&self.tipo_servico)
            .text_or(
                self.cpf_cnpj_tomador.as_deref().filter(|d| !d.is_empty()),
                "pj",
            )
            .finish()
    }
}

/// One withheld tax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithholdingItem {
    /// Rate (%).
    pub aliquota: f64,
    /// Amount withheld.
    pub valor: f64,
    /// Statutory reference.
    pub base_legal: String,
}

/// Withholding result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithholdingResult {
    /// Gross service value.
    pub valor_servico: f64,
    /// Service code.
    pub tipo_servico: String,
    /// Taker document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf_cnpj_tomador: Option<String>,
    /// PIS.
    pub pis: WithholdingItem,
    /// COFINS.
    pub cofins: WithholdingItem,
    /// CSLL.
    pub csll: WithholdingItem,
    /// IRRF.
    pub irrf: WithholdingItem,
    /// Sum of the four components.
    pub total_retido: f64,
    /// Service value net of withholding.
    pub valor_liquido: f64,
}

/// Withholding calculator bound to a rate set.
#[derive(Debug, Clone, Copy)]
pub struct WithholdingEngine<'a> {
    rates: &'a WithholdingRates,
}

impl<'a> WithholdingEngine<'a> {
    /// Create an engine over `rates`.
    pub fn new(rates: &'a WithholdingRates) -> Self {
        Self { rates }
    }

    /// Compute the four withholdings.
    pub fn calculate(&self, input: &WithholdingInput) -> Result<WithholdingResult, CalculationError> {
        self.compute(input, &mut MemoryTrail::new())
    }

    /// Compute with memory trail and fingerprint.
    pub fn calculate_with_memory(
        &self,
        input: &WithholdingInput,
    ) -> Result<Audited<WithholdingResult>, CalculationError> {
        let mut memoria = MemoryTrail::new();
        let resultado = self.compute(input, &mut memoria)?;
        let base_legal = legal_basis(self.rates);
        Ok(Audited::seal(
            resultado,
            memoria,
            FingerprintDomain::Retencoes,
            &input.canonical(),
            base_legal,
        ))
    }

    fn compute(
        &self,
        input: &WithholdingInput,
        trail: &mut MemoryTrail,
    ) -> Result<WithholdingResult, CalculationError> {
        let valor = positive("valorServico", input.valor_servico)?;
        tracing::debug!(valor, tipo_servico = %input.tipo_servico, "calculating withholding");

        let raw = |rate: &WithholdingRate| valor * rate.aliquota / 100.0;
        let mut total = 0.0;
        for (name, rate) in self.rates.items() {
            let v = raw(rate);
            total += v;
            trail.record(
                format!("{name} ({})", format_rate(rate.aliquota)),
                format!("{} × {}", format_brl(valor), format_rate(rate.aliquota)),
                format_brl(v),
            );
        }
        let liquido = valor - total;
        ensure_finite("retenções", &[total, liquido])?;

        trail
            .record(
                "Total retido",
                "PIS + COFINS + CSLL + IRRF",
                format_brl(total),
            )
            .record(
                "Valor líquido",
                format!("{} − {}", format_brl(valor), format_brl(total)),
                format_brl(liquido),
            );

        let item = |rate: &WithholdingRate| WithholdingItem {
            aliquota: rate.aliquota,
            valor: round2(raw(rate)),
            base_legal: rate.base_legal.clone(),
        };
        Ok(WithholdingResult {
            valor_servico: round2(valor),
            tipo_servico: input.tipo_servico.clone(),
            cpf_cnpj_tomador: input.cpf_cnpj_tomador.clone(),
            pis: item(&self.rates.pis),
            cofins: item(&self.rates.cofins),
            csll: item(&self.rates.csll),
            irrf: item(&self.rates.irrf),
            total_retido: round2(total),
            valor_liquido: round2(liquido),
        })
    }
}

/// Distinct statutory references of the rate set, in presentation order.
fn legal_basis(rates: &WithholdingRates) -> String {
    let mut bases: Vec<&str> = Vec::new();
    for (_, rate) in rates.items() {
        if !bases.contains(&rate.base_legal.as_str()) {
            bases.push(&rate.base_legal);
        }
    }
    bases.join("; ")
}
