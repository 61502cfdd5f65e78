//! Sequential batch extraction. A failing document is recorded as an
//! `erro` entry and never aborts the batch.

use serde::Serialize;

use crate::extract::{extract, ExtractedInvoice};

/// Warning attached to incomplete documents.
pub const INCOMPLETE_WARNING: &str = "Alguns dados não foram encontrados no XML";

/// Outcome for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntry {
    /// Origin, destination, and a positive value were all found.
    Processado {
        /// Extracted data.
        #[serde(flatten)]
        dados: ExtractedInvoice,
    },
    /// Parsed, but some DIFAL inputs are missing.
    DadosIncompletos {
        /// Extracted data.
        #[serde(flatten)]
        dados: ExtractedInvoice,
        /// What is missing.
        aviso: String,
    },
    /// The document could not be parsed.
    Erro {
        /// Parse error message.
        erro: String,
    },
}

impl BatchEntry {
    /// Classify one document.
    pub fn from_document(xml: &str) -> Self {
        match extract(xml) {
            Ok(dados) if dados.is_complete() => Self::Processado { dados },
            Ok(dados) => {
                tracing::warn!(
                    chave = dados.chave_acesso.as_deref().unwrap_or(""),
                    "NFe with incomplete DIFAL data"
                );
                Self::DadosIncompletos {
                    dados,
                    aviso: INCOMPLETE_WARNING.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "NFe rejected");
                Self::Erro {
                    erro: e.to_string(),
                }
            }
        }
    }

    /// Extracted data for the fully processed case.
    pub fn processed(&self) -> Option<&ExtractedInvoice> {
        match self {
            Self::Processado { dados } => Some(dados),
            _ => None,
        }
    }
}

/// Result of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Documents received.
    pub total: usize,
    /// Entries with status `processado`.
    pub processados: usize,
    /// Entries with status `dados_incompletos`.
    pub dados_incompletos: usize,
    /// Entries with status `erro`.
    pub erros: usize,
    /// One entry per document, in input order.
    pub resultados: Vec<BatchEntry>,
}

/// Extract every document in order.
pub fn process_batch<I, S>(documents: I) -> BatchReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let resultados: Vec<BatchEntry> = documents
        .into_iter()
        .map(|doc| BatchEntry::from_document(doc.as_ref()))
        .collect();
    let count = |pred: fn(&BatchEntry) -> bool| resultados.iter().filter(|e| pred(e)).count();

    let report = BatchReport {
        total: resultados.len(),
        processados: count(|e| matches!(e, BatchEntry::Processado { .. })),
        dados_incompletos: count(|e| matches!(e, BatchEntry::DadosIncompletos { .. })),
        erros: count(|e| matches!(e, BatchEntry::Erro { .. })),
        resultados,
    };
    tracing::info!(
        total = report.total,
        processados = report.processados,
        erros = report.erros,
        "processed NFe batch"
    );
    report
}
