//! # DIFAL Reporting
//!
//! Turns processed invoices into DIFAL calculations, a per-destination
//! consolidated report, and GNRE payment-guide data. Clock readings are
//! always supplied by the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use fisco_core::{round2, CalculationError, Uf};
use fisco_engine::{DifalCalculator, DifalResult, RateTable};
use serde::Serialize;

use crate::batch::{process_batch, BatchReport};
use crate::extract::{ExtractedInvoice, Party};

/// GNRE revenue code for DIFAL on sales to final consumers.
pub const GNRE_REVENUE_CODE: &str = "10008-7";

/// Days between issue and GNRE due date.
pub const GNRE_DUE_DAYS: i64 = 15;

/// Data for a GNRE payment guide.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GnreGuide {
    /// Revenue code.
    pub codigo_receita: &'static str,
    /// State receiving the payment.
    pub uf_favorecida: Uf,
    /// Originating document (access key).
    pub documento_origem: Option<String>,
    /// DIFAL amount.
    pub valor_principal: f64,
    /// FCP amount.
    pub valor_fcp: f64,
    /// Total to pay.
    pub valor_total: f64,
    /// Due date.
    pub data_vencimento: NaiveDate,
    /// Paying taxpayer (issuer).
    pub contribuinte: Party,
    /// Recipient.
    pub destinatario: Party,
}

impl GnreGuide {
    /// Build guide data. The due date counts from the invoice issue date,
    /// or from `today` when the invoice carries none.
    pub fn from_calculation(
        calculo: &DifalResult,
        invoice: &ExtractedInvoice,
        today: NaiveDate,
    ) -> Self {
        let issued = invoice.data_emissao.unwrap_or(today);
        Self {
            codigo_receita: GNRE_REVENUE_CODE,
            uf_favorecida: calculo.uf_destino,
            documento_origem: invoice.chave_acesso.clone(),
            valor_principal: calculo.difal,
            valor_fcp: calculo.fcp,
            valor_total: calculo.total_difal,
            data_vencimento: issued + Duration::days(GNRE_DUE_DAYS),
            contribuinte: invoice.emitente.clone(),
            destinatario: invoice.destinatario.clone(),
        }
    }
}

/// Totals for one destination UF.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UfSummary {
    /// Number of operations.
    pub quantidade: usize,
    /// Sum of operation values.
    pub valor_operacoes: f64,
    /// Sum of DIFAL.
    pub difal: f64,
    /// Sum of FCP.
    pub fcp: f64,
    /// DIFAL plus FCP.
    pub total: f64,
}

/// DIFAL totals over a set of calculations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedReport {
    /// Reporting month, `YYYY-MM`.
    pub periodo: String,
    /// Number of operations.
    pub total_operacoes: usize,
    /// Sum of DIFAL.
    pub total_difal: f64,
    /// Sum of FCP.
    pub total_fcp: f64,
    /// DIFAL plus FCP.
    pub total_geral: f64,
    /// Totals per destination.
    pub por_uf: BTreeMap<Uf, UfSummary>,
    /// Generation timestamp.
    pub gerado_em: DateTime<Utc>,
}

impl ConsolidatedReport {
    /// Aggregate `calculos` as of `generated_at`.
    pub fn build<'a, I>(calculos: I, generated_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a DifalResult>,
    {
        let mut por_uf: BTreeMap<Uf, UfSummary> = BTreeMap::new();
        let mut total_operacoes = 0;
        let (mut total_difal, mut total_fcp) = (0.0, 0.0);

        for calc in calculos {
            total_operacoes += 1;
            total_difal += calc.difal;
            total_fcp += calc.fcp;
            let uf = por_uf.entry(calc.uf_destino).or_default();
            uf.quantidade += 1;
            uf.valor_operacoes += calc.valor_operacao;
            uf.difal += calc.difal;
            uf.fcp += calc.fcp;
            uf.total += calc.difal + calc.fcp;
        }
        for uf in por_uf.values_mut() {
            uf.valor_operacoes = round2(uf.valor_operacoes);
            uf.difal = round2(uf.difal);
            uf.fcp = round2(uf.fcp);
            uf.total = round2(uf.total);
        }

        Self {
            periodo: generated_at.format("%Y-%m").to_string(),
            total_operacoes,
            total_difal: round2(total_difal),
            total_fcp: round2(total_fcp),
            total_geral: round2(total_difal + total_fcp),
            por_uf,
            gerado_em: generated_at,
        }
    }
}

/// DIFAL and guide data for one processed invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDifal {
    /// Access key.
    pub chave_acesso: Option<String>,
    /// DIFAL result.
    pub difal: DifalResult,
    /// Payment guide.
    pub gnre: GnreGuide,
}

/// Batch extraction followed by DIFAL on every processed invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDifalReport {
    /// Extraction outcome per document.
    pub lote: BatchReport,
    /// One entry per processed invoice whose DIFAL could be computed.
    pub calculos: Vec<InvoiceDifal>,
    /// Totals over `calculos`.
    pub relatorio: ConsolidatedReport,
}

/// DIFAL for one invoice, with its guide.
pub fn invoice_difal(
    invoice: &ExtractedInvoice,
    rates: &RateTable,
    today: NaiveDate,
) -> Result<InvoiceDifal, CalculationError> {
    let input = invoice.to_difal_input(rates)?;
    let difal = DifalCalculator::new(rates).calculate(&input)?;
    let gnre = GnreGuide::from_calculation(&difal, invoice, today);
    Ok(InvoiceDifal {
        chave_acesso: invoice.chave_acesso.clone(),
        difal,
        gnre,
    })
}

/// Extract every document, compute DIFAL for the processed ones, and
/// consolidate.
pub fn report_batch<I, S>(
    documents: I,
    rates: &RateTable,
    generated_at: DateTime<Utc>,
) -> BatchDifalReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let lote = process_batch(documents);
    let today = generated_at.date_naive();
    let calculos: Vec<InvoiceDifal> = lote
        .resultados
        .iter()
        .filter_map(|entry| entry.processed())
        .filter_map(|invoice| match invoice_difal(invoice, rates, today) {
            Ok(calc) => Some(calc),
            Err(e) => {
                tracing::warn!(
                    chave = invoice.chave_acesso.as_deref().unwrap_or(""),
                    error = %e,
                    "DIFAL not computed for NFe"
                );
                None
            }
        })
        .collect();
    let relatorio = ConsolidatedReport::build(calculos.iter().map(|c| &c.difal), generated_at);
    BatchDifalReport {
        lote,
        calculos,
        relatorio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use crate::extract::fixtures::{AUTHORIZED, NO_DESTINATION, NO_INF_NFE};
    use chrono::TimeZone;
    use fisco_engine::DifalInput;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 12, 0, 0).unwrap()
    }

    fn difal(valor: f64, destino: Uf) -> DifalResult {
        let rates = RateTable::default();
        let input = DifalInput::new(valor, 12.0, rates.internal_rate(destino), destino).with_fcp(2.0);
        DifalCalculator::new(&rates).calculate(&input).unwrap()
    }

    #[test]
    fn consolidates_by_destination() {
        let calcs = [difal(1000.0, Uf::Rj), difal(500.0, Uf::Rj), difal(1000.0, Uf::Sp)];
        let report = ConsolidatedReport::build(calcs.iter(), at());
        assert_eq!(report.periodo, "2024-04");
        assert_eq!(report.total_operacoes, 3);
        assert_eq!(report.por_uf.len(), 2);
        let rj = &report.por_uf[&Uf::Rj];
        assert_eq!(rj.quantidade, 2);
        assert_eq!(rj.valor_operacoes, 1500.0);
        assert_eq!(rj.difal, round2(calcs[0].difal + calcs[1].difal));
        let expected_difal = round2(calcs.iter().map(|c| c.difal).sum::<f64>());
        assert_eq!(report.total_difal, expected_difal);
        assert_eq!(report.total_geral, round2(report.total_difal + report.total_fcp));
    }

    #[test]
    fn empty_report() {
        let report = ConsolidatedReport::build(std::iter::empty(), at());
        assert_eq!(report.total_operacoes, 0);
        assert_eq!(report.total_geral, 0.0);
        assert!(report.por_uf.is_empty());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["geradoEm"], "2024-04-02T12:00:00Z");
        assert_eq!(json["totalFcp"], 0.0);
    }

    #[test]
    fn gnre_guide_from_invoice() {
        let invoice = extract(AUTHORIZED).unwrap();
        let rates = RateTable::default();
        let calc = invoice_difal(&invoice, &rates, at().date_naive()).unwrap();
        let guide = &calc.gnre;
        assert_eq!(guide.codigo_receita, "10008-7");
        assert_eq!(guide.uf_favorecida, Uf::Ba);
        assert_eq!(guide.documento_origem, invoice.chave_acesso);
        assert_eq!(guide.valor_principal, calc.difal.difal);
        assert_eq!(guide.valor_total, calc.difal.total_difal);
        assert_eq!(guide.data_vencimento, NaiveDate::from_ymd_opt(2024, 3, 30).unwrap());
        assert_eq!(guide.contribuinte.documento.as_deref(), Some("12345678000199"));
    }

    #[test]
    fn gnre_due_date_falls_back_to_today() {
        let invoice = ExtractedInvoice {
            uf_destino: Some(Uf::Ce),
            valor_operacao: 100.0,
            ..ExtractedInvoice::default()
        };
        let today = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
        let calc = invoice_difal(&invoice, &RateTable::default(), today).unwrap();
        assert_eq!(
            calc.gnre.data_vencimento,
            NaiveDate::from_ymd_opt(2025, 1, 4).unwrap()
        );
    }

    #[test]
    fn batch_report_only_counts_processed() {
        let report = report_batch(
            [AUTHORIZED, NO_DESTINATION, NO_INF_NFE],
            &RateTable::default(),
            at(),
        );
        assert_eq!(report.lote.total, 3);
        assert_eq!(report.lote.erros, 1);
        assert_eq!(report.calculos.len(), 1);
        assert_eq!(report.relatorio.total_operacoes, 1);
        assert!(report.relatorio.por_uf.contains_key(&Uf::Ba));
    }
}
