//! # MVA Lookup by NCM
//!
//! Resolves the agreed ST margin for a product (8-digit NCM) sold into a
//! destination UF, and corrects it for the interstate rate of the
//! operation. The margins come from the configured [`MvaTable`]; rates come
//! from the [`RateTable`].
//!
//! A zero margin (unlisted NCM, single-phase fuels) has nothing to adjust
//! and stays zero. So does a destination with a zero internal rate.

use fisco_core::numeric::{format_rate, round2};
use fisco_core::{
    CalculationError, CanonicalInput, FingerprintDomain, MemoryTrail, Uf, ValidationError,
};
use serde::{Deserialize, Serialize};

use crate::audit::Audited;
use crate::config::{MvaTable, RateTable};
use crate::icms_st::adjusted_mva;

/// Statutory basis of the ST margins.
pub const LEGAL_BASIS: &str = "Convênio ICMS 142/2018";

/// Description reported for an NCM the table does not list.
pub const NOT_LISTED: &str = "NCM não encontrado";

/// Margin resolved for one NCM and route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MvaLookup {
    /// Normalized 8-digit NCM.
    pub ncm: String,
    /// Product description, or [`NOT_LISTED`].
    pub descricao: String,
    /// Whether the table lists the NCM.
    pub encontrado: bool,
    /// Destination UF.
    pub uf_destino: Uf,
    /// Origin UF, when known.
    pub uf_origem: Option<Uf>,
    /// Destination internal rate (%).
    pub aliquota_interna: f64,
    /// Interstate rate (%) for the route.
    pub aliquota_interestadual: f64,
    /// Margin agreed for the destination (%).
    pub mva_original: f64,
    /// Margin corrected for the interstate rate (%).
    pub mva_ajustada: f64,
}

/// Strip punctuation from an NCM and require exactly eight digits.
pub fn normalize_ncm(raw: &str) -> Result<String, ValidationError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 8 {
        Ok(digits)
    } else {
        Err(ValidationError::BadFormat {
            field: "ncm",
            value: raw.to_string(),
            expected: "an 8-digit NCM",
        })
    }
}

/// MVA lookup bound to a margin table and a rate table.
#[derive(Debug, Clone, Copy)]
pub struct MvaCatalog<'a> {
    table: &'a MvaTable,
    rates: &'a RateTable,
}

impl<'a> MvaCatalog<'a> {
    /// Create a catalog over `table`, taking rates from `rates`.
    pub fn new(table: &'a MvaTable, rates: &'a RateTable) -> Self {
        Self { table, rates }
    }

    /// Margin (%) agreed for `ncm` into `destino`, when listed.
    pub fn margin(&self, ncm: &str, destino: Uf) -> Result<Option<f64>, ValidationError> {
        let ncm = normalize_ncm(ncm)?;
        Ok(self.table.get(&ncm).map(|entry| entry.mva_for(destino)))
    }

    /// Resolve and adjust the margin for `ncm` on the route
    /// `origem → destino`, with memory trail and fingerprint.
    pub fn lookup(
        &self,
        ncm: &str,
        destino: Uf,
        origem: Option<Uf>,
    ) -> Result<Audited<MvaLookup>, CalculationError> {
        let ncm = normalize_ncm(ncm)?;
        tracing::debug!(%ncm, %destino, origem = ?origem, "looking up MVA");

        let entry = self.table.get(&ncm);
        let mut trail = MemoryTrail::new();
        trail.record(
            format!("NCM {ncm}"),
            "Tabela de MVA",
            entry.map_or(NOT_LISTED, |e| e.descricao.as_str()),
        );

        let mva_original = entry.map_or(0.0, |e| e.mva_for(destino));
        trail.record(
            "MVA original",
            match entry {
                Some(e) if e.por_uf.contains_key(&destino) => format!("MVA acordada para {destino}"),
                Some(_) => "MVA nacional".to_string(),
                None => "NCM não listado".to_string(),
            },
            format_rate(mva_original),
        );

        let aliquota_interna = self.rates.internal_rate(destino);
        let aliquota_interestadual = self.rates.interstate_rate(origem, destino);
        let rota = origem.map_or_else(|| format!("? → {destino}"), |o| format!("{o} → {destino}"));
        trail.record(
            "Alíquotas",
            rota,
            format!(
                "interestadual {} | interna {}",
                format_rate(aliquota_interestadual),
                format_rate(aliquota_interna)
            ),
        );

        let mva_ajustada = if mva_original == 0.0 || aliquota_interna == 0.0 {
            mva_original
        } else {
            adjusted_mva(mva_original, aliquota_interestadual, aliquota_interna)?
        };
        trail.record(
            "MVA ajustada",
            format!(
                "((1 + {mva_original}%) × (1 − {aliquota_interestadual}%) / (1 − {aliquota_interna}%) − 1) × 100"
            ),
            format_rate(mva_ajustada),
        );

        let canonical = CanonicalInput::builder()
            .text(&ncm)
            .text(destino.as_str())
            .text_or(origem.as_ref().map(Uf::as_str), "")
            .finish();
        let resultado = MvaLookup {
            descricao: entry.map_or_else(|| NOT_LISTED.to_string(), |e| e.descricao.clone()),
            encontrado: entry.is_some(),
            ncm,
            uf_destino: destino,
            uf_origem: origem,
            aliquota_interna,
            aliquota_interestadual,
            mva_original: round2(mva_original),
            mva_ajustada: round2(mva_ajustada),
        };
        Ok(Audited::seal(
            resultado,
            trail,
            FingerprintDomain::Ncm,
            &canonical,
            LEGAL_BASIS,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(ncm: &str, destino: Uf, origem: Option<Uf>) -> Audited<MvaLookup> {
        let table = MvaTable::default();
        let rates = RateTable::default();
        MvaCatalog::new(&table, &rates)
            .lookup(ncm, destino, origem)
            .unwrap()
    }

    #[test]
    fn destination_override_adjusted_for_reduced_rate() {
        let r = lookup("40111000", Uf::Ba, Some(Uf::Sp)).resultado;
        assert!(r.encontrado);
        assert_eq!(r.descricao, "Pneus para automóveis");
        assert_eq!(r.mva_original, 45.0);
        assert_eq!(r.aliquota_interestadual, 7.0);
        assert_eq!(r.aliquota_interna, 20.5);
        assert_eq!(r.mva_ajustada, 69.62);
    }

    #[test]
    fn standard_rate_route() {
        let r = lookup("85171231", Uf::Rj, Some(Uf::Sp)).resultado;
        assert_eq!(r.mva_original, 9.0);
        assert_eq!(r.aliquota_interestadual, 12.0);
        assert_eq!(r.mva_ajustada, 22.97);
    }

    #[test]
    fn national_margin_when_destination_has_no_override() {
        let r = lookup("40112010", Uf::Ce, None).resultado;
        assert_eq!(r.mva_original, 32.0);
        let trail = lookup("40112010", Uf::Ce, None).memoria;
        assert_eq!(trail.steps()[1].formula, "MVA nacional");
        assert_eq!(trail.steps()[2].formula, "? → CE");
    }

    #[test]
    fn same_uf_keeps_the_original_margin() {
        let r = lookup("84713012", Uf::Sp, Some(Uf::Sp)).resultado;
        assert_eq!(r.aliquota_interestadual, 18.0);
        assert_eq!(r.mva_ajustada, 35.0);
    }

    #[test]
    fn unlisted_ncm_has_no_margin() {
        let r = lookup("99999999", Uf::Sp, Some(Uf::Mg)).resultado;
        assert!(!r.encontrado);
        assert_eq!(r.descricao, NOT_LISTED);
        assert_eq!(r.mva_original, 0.0);
        assert_eq!(r.mva_ajustada, 0.0);
    }

    #[test]
    fn fuels_carry_no_margin() {
        let r = lookup("27101921", Uf::Ba, Some(Uf::Sp)).resultado;
        assert!(r.encontrado);
        assert_eq!(r.mva_ajustada, 0.0);
    }

    #[test]
    fn punctuated_ncm_is_normalized() {
        let r = lookup("8471.30.12", Uf::Rj, None).resultado;
        assert_eq!(r.ncm, "84713012");
        assert_eq!(r.mva_original, 38.0);
    }

    #[test]
    fn malformed_ncm_is_rejected() {
        let table = MvaTable::default();
        let rates = RateTable::default();
        let err = MvaCatalog::new(&table, &rates)
            .lookup("8471", Uf::Sp, None)
            .unwrap_err();
        assert_eq!(err.field(), Some("ncm"));
        assert!(normalize_ncm("847130120").is_err());
    }

    #[test]
    fn fingerprint_covers_route() {
        let a = lookup("40111000", Uf::Ba, Some(Uf::Sp));
        let b = lookup("40111000", Uf::Ba, Some(Uf::Sp));
        let c = lookup("40111000", Uf::Ba, None);
        assert!(a.hash.as_str().starts_with("NCM-"));
        assert_eq!(a.hash.domain(), FingerprintDomain::Ncm);
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
        assert_eq!(a.base_legal, LEGAL_BASIS);
    }

    #[test]
    fn margin_for_listed_ncm() {
        let table = MvaTable::default();
        let rates = RateTable::default();
        let catalog = MvaCatalog::new(&table, &rates);
        assert_eq!(catalog.margin("22030000", Uf::Ba).unwrap(), Some(150.0));
        assert_eq!(catalog.margin("22030000", Uf::Go).unwrap(), Some(140.0));
        assert_eq!(catalog.margin("12345678", Uf::Go).unwrap(), None);
    }

    #[test]
    fn memory_trail_shape() {
        let steps = lookup("40111000", Uf::Ba, Some(Uf::Sp)).memoria;
        let steps = steps.steps();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].description, "NCM 40111000");
        assert_eq!(steps[1].formula, "MVA acordada para BA");
        assert_eq!(steps[2].result, "interestadual 7.00% | interna 20.50%");
        assert_eq!(steps[3].result, "69.62%");
    }
}
