//! # IBS/CBS Transition Blender (EC 132/2023)
//!
//! Between 2026 and 2033 the legacy taxes (ICMS or ISS, PIS/COFINS) are
//! phased out while the new dual VAT (CBS federal, IBS subnational) is
//! phased in. Each year of the [`TransitionSchedule`] gives a weight per
//! tax, as a percentage of its full rate; a blend is the sum of every tax at
//! its weighted rate.
//!
//! Years outside the schedule fall back to its first row.
//!
//! [`TransitionBlender::reform`] computes the target regime on its own:
//! CBS and IBS at full rate, net of input credits. The comparison against
//! today's ICMS + PIS/COFINS load uses the same configured rates.

use std::collections::BTreeMap;
use std::str::FromStr;

use fisco_core::numeric::{below, format_brl, non_negative, positive, round2};
use fisco_core::{CalculationError, CanonicalInput, FingerprintDomain, MemoryTrail, ValidationError};
use serde::{Deserialize, Serialize};

use crate::audit::Audited;
use crate::config::{ScheduleEntry, TransitionConfig};
use crate::ensure_finite;

/// Statutory basis of the schedule.
pub const LEGAL_BASIS: &str = "EC 132/2023";

/// Statutory basis of the full-rate IBS/CBS calculation.
pub const REFORM_LEGAL_BASIS: &str = "EC 132/2023 • LC (pendente)";

/// Operation label used when the caller gives none.
pub const DEFAULT_REFORM_OPERATION: &str = "venda";

/// Kind of operation, selecting the legacy subnational tax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Goods: ICMS.
    #[default]
    Mercadoria,
    /// Services: ISS.
    Servico,
}

impl OperationType {
    /// Return the string representation of this operation type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mercadoria => "mercadoria",
            Self::Servico => "servico",
        }
    }

    /// Return all operation types.
    pub fn all() -> &'static [OperationType] {
        &[Self::Mercadoria, Self::Servico]
    }

    /// Legacy tax label.
    pub fn legacy_tax(&self) -> &'static str {
        match self {
            Self::Mercadoria => "ICMS",
            Self::Servico => "ISS",
        }
    }

    /// Parse with a field name for error reporting.
    pub fn parse_field(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        value.parse().map_err(|_| ValidationError::UnknownValue {
            field,
            value: value.to_string(),
        })
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown operation type: {s}"))
    }
}

/// Blend for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResult {
    /// Requested year.
    pub ano: i32,
    /// Phase label of the row used.
    pub fase: String,
    /// Operation type.
    pub tipo_operacao: OperationType,
    /// Operation value.
    pub valor_operacao: f64,
    /// Weighted ICMS (goods) or ISS (services).
    pub icms_ou_iss: f64,
    /// Weighted PIS/COFINS.
    pub pis_cofins: f64,
    /// Weighted CBS.
    pub cbs: f64,
    /// Weighted IBS.
    pub ibs: f64,
    /// Legacy component: `icmsOuIss + pisCofins`.
    pub tributos_atuais: f64,
    /// New-regime component: `cbs + ibs`.
    pub tributos_novos: f64,
    /// Total tax load.
    pub total: f64,
    /// Total as a percentage of the operation value.
    pub percentual: f64,
    /// Schedule row used.
    pub cronograma: ScheduleEntry,
}

/// Input of the full-rate IBS/CBS calculation. Rates are percentages;
/// credits are amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReformInput {
    /// Operation value.
    pub valor_operacao: f64,
    /// Free-form operation label, e.g. `venda`.
    pub tipo_operacao: String,
    /// IBS rate. Defaults to the configured rate.
    pub aliquota_ibs: Option<f64>,
    /// CBS rate. Defaults to the configured rate.
    pub aliquota_cbs: Option<f64>,
    /// IBS paid on inputs.
    pub credito_ibs: f64,
    /// CBS paid on inputs.
    pub credito_cbs: f64,
}

impl ReformInput {
    /// A sale of `valor_operacao` at the configured rates, without credits.
    pub fn new(valor_operacao: f64) -> Self {
        Self {
            valor_operacao,
            tipo_operacao: DEFAULT_REFORM_OPERATION.to_string(),
            aliquota_ibs: None,
            aliquota_cbs: None,
            credito_ibs: 0.0,
            credito_cbs: 0.0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        positive("valorOperacao", self.valor_operacao)?;
        for (field, rate) in [("aliquotaIbs", self.aliquota_ibs), ("aliquotaCbs", self.aliquota_cbs)] {
            if let Some(rate) = rate {
                non_negative(field, rate)?;
                below(field, rate, 100.0)?;
            }
        }
        non_negative("creditoIbs", self.credito_ibs)?;
        non_negative("creditoCbs", self.credito_cbs)?;
        Ok(())
    }
}

/// Full-rate IBS/CBS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReformResult {
    /// Operation value.
    pub valor_operacao: f64,
    /// Operation label.
    pub tipo_operacao: String,
    /// IBS rate applied (%).
    pub aliquota_ibs: f64,
    /// CBS rate applied (%).
    pub aliquota_cbs: f64,
    /// CBS before credits.
    pub cbs_bruto: f64,
    /// IBS before credits.
    pub ibs_bruto: f64,
    /// CBS net of credits, never negative.
    pub cbs_liquido: f64,
    /// IBS net of credits, never negative.
    pub ibs_liquido: f64,
    /// `cbsLiquido + ibsLiquido`.
    pub total: f64,
    /// Total as a percentage of the operation value.
    pub aliquota_efetiva: f64,
}

/// Today's ICMS + PIS/COFINS load on an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBurden {
    /// ICMS at the configured full rate.
    pub icms: f64,
    /// PIS/COFINS at the configured combined rate.
    pub pis_cofins: f64,
    /// `icms + pisCofins`.
    pub total: f64,
}

/// Current regime against the reform for the same operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReformComparison {
    /// Current load.
    pub atual: CurrentBurden,
    /// Reform load, audited.
    pub reforma: Audited<ReformResult>,
    /// Reform total minus current total.
    pub diferenca: f64,
    /// `diferenca` relative to the current total (%).
    pub percentual: f64,
}

/// Transition blender bound to a schedule and rate set.
#[derive(Debug, Clone, Copy)]
pub struct TransitionBlender<'a> {
    config: &'a TransitionConfig,
}

impl<'a> TransitionBlender<'a> {
    /// Create a blender over `config`.
    pub fn new(config: &'a TransitionConfig) -> Self {
        Self { config }
    }

    /// Schedule row for `ano`, or the first row when the year is not
    /// scheduled.
    pub fn row(&self, ano: i32) -> &'a ScheduleEntry {
        let schedule = &self.config.schedule;
        match schedule.get(ano) {
            Some(row) => row,
            None => {
                let first = schedule.first();
                tracing::warn!(ano, fallback = first.ano, "year outside transition schedule");
                first
            }
        }
    }

    /// Blend for one year, with memory trail and fingerprint.
    pub fn calculate(
        &self,
        valor: f64,
        ano: i32,
        tipo: OperationType,
    ) -> Result<Audited<TransitionResult>, CalculationError> {
        let valor = positive("valorOperacao", valor)?;
        tracing::debug!(valor, ano, tipo = %tipo, "calculating transition blend");

        let row = self.row(ano);
        let rates = &self.config.rates;
        let mut trail = MemoryTrail::new();

        let (legacy_weight, legacy_rate) = match tipo {
            OperationType::Mercadoria => (row.icms, rates.icms),
            OperationType::Servico => (row.iss, rates.iss),
        };
        trail.record(
            format!("Ano {ano} - {}", row.fase),
            "Cronograma EC 132/2023",
            format!("{} {}% → IBS {}%", tipo.legacy_tax(), legacy_weight, row.ibs),
        );

        let icms_ou_iss = weighted(valor, legacy_rate, legacy_weight);
        trail.record(
            format!("{} ({}% do integral)", tipo.legacy_tax(), legacy_weight),
            format!("{} × {}% × {}%", format_brl(valor), legacy_rate, legacy_weight),
            format_brl(icms_ou_iss),
        );

        let mut pis_cofins = 0.0;
        if row.pis > 0.0 {
            pis_cofins = weighted(valor, rates.pis_cofins, row.pis);
            trail.record(
                format!("PIS/COFINS ({}% do integral)", row.pis),
                format!("{} × {:.2}% × {}%", format_brl(valor), rates.pis_cofins, row.pis),
                format_brl(pis_cofins),
            );
        }

        let mut cbs = 0.0;
        if row.cbs > 0.0 {
            cbs = weighted(valor, rates.cbs, row.cbs);
            trail.record(
                format!("CBS ({}% do integral)", row.cbs),
                format!("{} × {}% × {}%", format_brl(valor), rates.cbs, row.cbs),
                format_brl(cbs),
            );
        }

        let mut ibs = 0.0;
        if row.ibs > 0.0 {
            ibs = weighted(valor, rates.ibs, row.ibs);
            trail.record(
                format!("IBS ({}% do integral)", row.ibs),
                format!("{} × {}% × {}%", format_brl(valor), rates.ibs, row.ibs),
                format_brl(ibs),
            );
        }

        let total = icms_ou_iss + pis_cofins + cbs + ibs;
        let percentual = total / valor * 100.0;
        ensure_finite("transição", &[total, percentual])?;
        trail.record(
            "Carga Tributária Total",
            "Soma de todos os tributos",
            format!("{} ({percentual:.2}%)", format_brl(total)),
        );

        let resultado = TransitionResult {
            ano,
            fase: row.fase.clone(),
            tipo_operacao: tipo,
            valor_operacao: round2(valor),
            icms_ou_iss: round2(icms_ou_iss),
            pis_cofins: round2(pis_cofins),
            cbs: round2(cbs),
            ibs: round2(ibs),
            tributos_atuais: round2(icms_ou_iss + pis_cofins),
            tributos_novos: round2(cbs + ibs),
            total: round2(total),
            percentual: round2(percentual),
            cronograma: row.clone(),
        };
        let canonical = CanonicalInput::builder()
            .amount(valor)
            .integer(i64::from(ano))
            .text(tipo.as_str())
            .finish();
        Ok(Audited::seal(
            resultado,
            trail,
            FingerprintDomain::Transicao,
            &canonical,
            LEGAL_BASIS,
        ))
    }

    /// Blend for every scheduled year.
    pub fn compare_years(
        &self,
        valor: f64,
        tipo: OperationType,
    ) -> Result<BTreeMap<i32, Audited<TransitionResult>>, CalculationError> {
        self.config
            .schedule
            .entries()
            .iter()
            .map(|row| Ok((row.ano, self.calculate(valor, row.ano, tipo)?)))
            .collect()
    }
}

impl TransitionBlender<'_> {
    /// IBS and CBS at full rate, net of credits, with memory trail and
    /// fingerprint.
    pub fn reform(&self, input: &ReformInput) -> Result<Audited<ReformResult>, CalculationError> {
        self.reform_sealed(input).map(|(audited, _)| audited)
    }

    /// Current ICMS + PIS/COFINS load against the reform total.
    pub fn compare_current_vs_reform(
        &self,
        input: &ReformInput,
    ) -> Result<ReformComparison, CalculationError> {
        let (reforma, total_reforma) = self.reform_sealed(input)?;
        let valor = input.valor_operacao;
        let rates = &self.config.rates;
        let icms = valor * rates.icms / 100.0;
        let pis_cofins = valor * rates.pis_cofins / 100.0;
        let total_atual = icms + pis_cofins;
        let diferenca = total_reforma - total_atual;
        let percentual = if total_atual > 0.0 {
            diferenca / total_atual * 100.0
        } else {
            0.0
        };
        ensure_finite("comparação reforma", &[diferenca, percentual])?;
        Ok(ReformComparison {
            atual: CurrentBurden {
                icms: round2(icms),
                pis_cofins: round2(pis_cofins),
                total: round2(total_atual),
            },
            reforma,
            diferenca: round2(diferenca),
            percentual: round2(percentual),
        })
    }

    /// Audited rounded result plus the unrounded total.
    fn reform_sealed(
        &self,
        input: &ReformInput,
    ) -> Result<(Audited<ReformResult>, f64), CalculationError> {
        input.validate()?;
        let valor = input.valor_operacao;
        let aliquota_ibs = input.aliquota_ibs.unwrap_or(self.config.rates.ibs);
        let aliquota_cbs = input.aliquota_cbs.unwrap_or(self.config.rates.cbs);
        tracing::debug!(valor, aliquota_ibs, aliquota_cbs, "calculating IBS/CBS");

        let mut trail = MemoryTrail::new();
        trail.record("Base de Cálculo", "Valor da operação", format_brl(valor));

        let cbs_bruto = valor * aliquota_cbs / 100.0;
        trail.record(
            "CBS - Contribuição sobre Bens e Serviços",
            format!("{} × {aliquota_cbs}%", format_brl(valor)),
            format_brl(cbs_bruto),
        );
        let ibs_bruto = valor * aliquota_ibs / 100.0;
        trail.record(
            "IBS - Imposto sobre Bens e Serviços",
            format!("{} × {aliquota_ibs}%", format_brl(valor)),
            format_brl(ibs_bruto),
        );

        let cbs_liquido = (cbs_bruto - input.credito_cbs).max(0.0);
        let ibs_liquido = (ibs_bruto - input.credito_ibs).max(0.0);
        if input.credito_cbs > 0.0 || input.credito_ibs > 0.0 {
            trail.record(
                "Após Créditos",
                format!(
                    "CBS: {} - {} | IBS: {} - {}",
                    format_brl(cbs_bruto),
                    format_brl(input.credito_cbs),
                    format_brl(ibs_bruto),
                    format_brl(input.credito_ibs)
                ),
                format!("CBS: {} | IBS: {}", format_brl(cbs_liquido), format_brl(ibs_liquido)),
            );
        }

        let total = cbs_liquido + ibs_liquido;
        let aliquota_efetiva = total / valor * 100.0;
        ensure_finite("IBS/CBS", &[total, aliquota_efetiva])?;
        trail.record(
            "Total IBS + CBS (IVA Dual)",
            format!("{} + {}", format_brl(cbs_liquido), format_brl(ibs_liquido)),
            format_brl(total),
        );

        let canonical = CanonicalInput::builder()
            .amount(valor)
            .text(&input.tipo_operacao)
            .amount(aliquota_ibs)
            .amount(aliquota_cbs)
            .amount(input.credito_ibs)
            .amount(input.credito_cbs)
            .finish();
        let resultado = ReformResult {
            valor_operacao: round2(valor),
            tipo_operacao: input.tipo_operacao.clone(),
            aliquota_ibs,
            aliquota_cbs,
            cbs_bruto: round2(cbs_bruto),
            ibs_bruto: round2(ibs_bruto),
            cbs_liquido: round2(cbs_liquido),
            ibs_liquido: round2(ibs_liquido),
            total: round2(total),
            aliquota_efetiva: round2(aliquota_efetiva),
        };
        let audited = Audited::seal(
            resultado,
            trail,
            FingerprintDomain::IbsCbs,
            &canonical,
            REFORM_LEGAL_BASIS,
        );
        Ok((audited, total))
    }
}

fn weighted(valor: f64, rate: f64, weight: f64) -> f64 {
    valor * (rate / 100.0) * (weight / 100.0)
}
