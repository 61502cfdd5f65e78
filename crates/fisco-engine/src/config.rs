//! # Engine Configuration
//!
//! Reference tables are injected, never global. [`EngineConfig::default`]
//! carries the statutory values; deployments and tests substitute their own
//! by loading YAML:
//!
//! ```yaml
//! rates:
//!   internal: { SP: 18, RJ: 22 }
//!   fcp: { RJ: 2 }
//! withholding:
//!   irrf: { aliquota: 1.5, base_legal: "IN RFB 1.234/2012" }
//! mva:
//!   "40111000": { descricao: Pneus, mva_original: 42, por_uf: { BA: 45 } }
//! ```
//!
//! Every section and every field falls back to its default when omitted.

use std::collections::BTreeMap;
use std::path::Path;

use fisco_core::{Region, Uf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::difal::Methodology;

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The YAML did not match the expected shape.
    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The values are structurally valid but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// All reference data the calculators read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// ICMS rates per jurisdiction and the methodology mapping.
    pub rates: RateTable,
    /// Federal withholding rates.
    pub withholding: WithholdingRates,
    /// Reform transition schedule and base rates.
    pub transition: TransitionConfig,
    /// ST margins per NCM.
    pub mva: MvaTable,
}

impl EngineConfig {
    /// Parse a YAML document, filling omitted values with defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        tracing::info!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let rates = self
            .rates
            .internal
            .iter()
            .chain(self.rates.fcp.iter())
            .map(|(uf, rate)| (uf.as_str(), *rate))
            .chain([
                ("fallback_internal", self.rates.fallback_internal),
                ("interstate_reduced", self.rates.interstate_reduced),
                ("interstate_standard", self.rates.interstate_standard),
            ]);
        for (key, rate) in rates {
            if !(0.0..100.0).contains(&rate) {
                return Err(ConfigError::Invalid(format!(
                    "rate for {key} must be in [0, 100), got {rate}"
                )));
            }
        }
        for (name, item) in self.withholding.items() {
            if !item.aliquota.is_finite() || item.aliquota < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "withholding rate for {name} must be non-negative, got {}",
                    item.aliquota
                )));
            }
        }
        for (ncm, entry) in self.mva.entries() {
            if !is_ncm(ncm) {
                return Err(ConfigError::Invalid(format!(
                    "MVA key must be an 8-digit NCM, got \"{ncm}\""
                )));
            }
            let margins = std::iter::once(entry.mva_original).chain(entry.por_uf.values().copied());
            for mva in margins {
                if !mva.is_finite() || mva < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "MVA for NCM {ncm} must be non-negative, got {mva}"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn is_ncm(code: &str) -> bool {
    code.len() == 8 && code.bytes().all(|b| b.is_ascii_digit())
}

// -- ICMS rates ---------------------------------------------------------------

/// ICMS rate reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateTable {
    /// Destination-internal ICMS rate (%) per UF.
    pub internal: BTreeMap<Uf, f64>,
    /// FCP surcharge (%) per UF. Absent means zero.
    pub fcp: BTreeMap<Uf, f64>,
    /// Internal rate used for a UF missing from `internal`.
    pub fallback_internal: f64,
    /// Interstate rate for operations from the South/Southeast into the
    /// North, Northeast, Center-West, or Espírito Santo.
    pub interstate_reduced: f64,
    /// Interstate rate for every other operation.
    pub interstate_standard: f64,
    /// UFs whose default DIFAL methodology differs from dual base.
    pub methodology: BTreeMap<Uf, Methodology>,
}

impl Default for RateTable {
    fn default() -> Self {
        use Uf::*;
        let internal = [
            (Ac, 19.0),
            (Al, 19.0),
            (Am, 20.0),
            (Ap, 18.0),
            (Ba, 20.5),
            (Ce, 20.0),
            (Df, 20.0),
            (Es, 17.0),
            (Go, 19.0),
            (Ma, 22.0),
            (Mg, 18.0),
            (Ms, 17.0),
            (Mt, 17.0),
            (Pa, 19.0),
            (Pb, 20.0),
            (Pe, 20.5),
            (Pi, 21.0),
            (Pr, 19.5),
            (Rj, 22.0),
            (Rn, 20.0),
            (Ro, 19.5),
            (Rr, 20.0),
            (Rs, 17.0),
            (Sc, 17.0),
            (Se, 19.0),
            (Sp, 18.0),
            (To, 20.0),
        ]
        .into_iter()
        .collect();

        Self {
            internal,
            fcp: BTreeMap::new(),
            fallback_internal: 18.0,
            interstate_reduced: 7.0,
            interstate_standard: 12.0,
            methodology: [(Es, Methodology::BaseUnica)].into_iter().collect(),
        }
    }
}

impl RateTable {
    /// Destination-internal ICMS rate (%).
    pub fn internal_rate(&self, uf: Uf) -> f64 {
        self.internal
            .get(&uf)
            .copied()
            .unwrap_or(self.fallback_internal)
    }

    /// FCP surcharge (%), zero when the UF has none.
    pub fn fcp_rate(&self, uf: Uf) -> f64 {
        self.fcp.get(&uf).copied().unwrap_or(0.0)
    }

    /// Interstate ICMS rate (%) for an operation into `destination`.
    ///
    /// The reduced rate applies from a South or Southeast origin (ES
    /// included) to a North, Northeast or Center-West destination. Any
    /// other pair, including an unknown origin, takes the standard rate.
    /// Same-UF operations use the internal rate.
    pub fn interstate_rate(&self, origin: Option<Uf>, destination: Uf) -> f64 {
        let Some(origin) = origin else {
            return self.interstate_standard;
        };
        if origin == destination {
            return self.internal_rate(destination);
        }
        let south = |uf: Uf| matches!(uf.region(), Region::Sul | Region::Sudeste);
        if south(origin) && !south(destination) {
            self.interstate_reduced
        } else {
            self.interstate_standard
        }
    }

    /// Methodology applied when the caller does not choose one.
    pub fn default_methodology(&self, destination: Uf) -> Methodology {
        self.methodology
            .get(&destination)
            .copied()
            .unwrap_or(Methodology::BaseDupla)
    }
}

// -- Withholding --------------------------------------------------------------

/// One withheld tax: rate and statutory basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithholdingRate {
    /// Rate (%).
    pub aliquota: f64,
    /// Statutory reference.
    pub base_legal: String,
}

impl WithholdingRate {
    fn new(aliquota: f64, base_legal: &str) -> Self {
        Self {
            aliquota,
            base_legal: base_legal.to_string(),
        }
    }
}

/// Federal withholding rates on service invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WithholdingRates {
    /// PIS.
    pub pis: WithholdingRate,
    /// COFINS.
    pub cofins: WithholdingRate,
    /// CSLL.
    pub csll: WithholdingRate,
    /// IRRF. Flat rate; the real table is bracket dependent.
    pub irrf: WithholdingRate,
}

impl Default for WithholdingRates {
    fn default() -> Self {
        Self {
            pis: WithholdingRate::new(0.65, "Lei 10.833/2003"),
            cofins: WithholdingRate::new(3.00, "Lei 10.833/2003"),
            csll: WithholdingRate::new(1.00, "Lei 10.833/2003"),
            irrf: WithholdingRate::new(1.50, "IN RFB 1.234/2012"),
        }
    }
}

impl WithholdingRates {
    /// The four taxes in presentation order.
    pub fn items(&self) -> [(&'static str, &WithholdingRate); 4] {
        [
            ("PIS", &self.pis),
            ("COFINS", &self.cofins),
            ("CSLL", &self.csll),
            ("IRRF", &self.irrf),
        ]
    }
}

// -- MVA ----------------------------------------------------------------------

/// Agreed ST margin for one NCM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MvaEntry {
    /// Product description.
    pub descricao: String,
    /// National MVA (%), used when the destination has no override.
    pub mva_original: f64,
    /// Per-destination MVA (%).
    #[serde(default)]
    pub por_uf: BTreeMap<Uf, f64>,
}

impl MvaEntry {
    fn new(descricao: &str, mva_original: f64, por_uf: &[(Uf, f64)]) -> Self {
        Self {
            descricao: descricao.to_string(),
            mva_original,
            por_uf: por_uf.iter().copied().collect(),
        }
    }

    /// MVA (%) for operations into `destination`.
    pub fn mva_for(&self, destination: Uf) -> f64 {
        self.por_uf
            .get(&destination)
            .copied()
            .unwrap_or(self.mva_original)
    }
}

/// ST margins keyed by 8-digit NCM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MvaTable(BTreeMap<String, MvaEntry>);

impl MvaTable {
    /// Table from explicit entries.
    pub fn new(entries: impl IntoIterator<Item = (String, MvaEntry)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Entry for a normalized NCM.
    pub fn get(&self, ncm: &str) -> Option<&MvaEntry> {
        self.0.get(ncm)
    }

    /// All entries in NCM order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &MvaEntry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of NCMs listed.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table lists no NCM.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for MvaTable {
    fn default() -> Self {
        use Uf::*;

        fn flat(mva: f64, ufs: &[Uf]) -> Vec<(Uf, f64)> {
            ufs.iter().map(|uf| (*uf, mva)).collect()
        }

        let south = [Sp, Rj, Mg, Pr, Sc, Rs];
        let entries = [
            (
                "40111000",
                MvaEntry::new(
                    "Pneus para automóveis",
                    42.0,
                    &[(Sp, 42.0), (Rj, 42.0), (Mg, 42.0), (Pr, 42.0), (Sc, 42.0), (Rs, 42.0), (Ba, 45.0), (Go, 45.0)],
                ),
            ),
            (
                "40112010",
                MvaEntry::new("Pneus para ônibus e caminhões", 32.0, &[(Sp, 32.0), (Rj, 35.0), (Mg, 32.0)]),
            ),
            ("30049039", MvaEntry::new("Medicamentos lista positiva", 33.0, &flat(33.0, &south))),
            (
                "84713012",
                MvaEntry::new(
                    "Notebooks",
                    35.0,
                    &[(Sp, 35.0), (Rj, 38.0), (Mg, 36.0), (Pr, 35.0), (Sc, 35.0), (Rs, 37.0)],
                ),
            ),
            ("85171231", MvaEntry::new("Telefones celulares", 9.0, &flat(9.0, &south))),
            (
                "85287200",
                MvaEntry::new("Televisores", 19.0, &[(Sp, 19.0), (Rj, 22.0), (Mg, 19.0), (Pr, 20.0)]),
            ),
            (
                "22030000",
                MvaEntry::new("Cervejas", 140.0, &[flat(140.0, &south), vec![(Ba, 150.0)]].concat()),
            ),
            (
                "22021000",
                MvaEntry::new("Refrigerantes", 140.0, &[(Sp, 140.0), (Rj, 155.0), (Mg, 150.0)]),
            ),
            // Single-phase fuels carry no margin.
            ("27101921", MvaEntry::new("Gasolina", 0.0, &[])),
            ("27101259", MvaEntry::new("Diesel", 0.0, &[])),
            ("27111910", MvaEntry::new("GLP", 0.0, &[])),
            ("33051000", MvaEntry::new("Xampus", 45.59, &flat(45.59, &[Sp, Rj, Mg, Pr]))),
            (
                "33072010",
                MvaEntry::new("Desodorantes", 45.59, &[(Sp, 45.59), (Rj, 48.0), (Mg, 45.59)]),
            ),
            ("11010010", MvaEntry::new("Farinha de trigo", 25.0, &flat(25.0, &[Sp, Rj, Mg, Pr]))),
            ("15079011", MvaEntry::new("Óleo de soja", 15.0, &flat(15.0, &[Sp, Rj, Mg, Pr]))),
        ];
        Self::new(entries.into_iter().map(|(ncm, entry)| (ncm.to_string(), entry)))
    }
}

// -- Transition ---------------------------------------------------------------

/// Full-weight rates (%) used by the transition simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionRates {
    /// ICMS on goods.
    pub icms: f64,
    /// ISS on services.
    pub iss: f64,
    /// PIS + COFINS combined.
    pub pis_cofins: f64,
    /// CBS.
    pub cbs: f64,
    /// IBS.
    pub ibs: f64,
}

impl Default for TransitionRates {
    fn default() -> Self {
        Self {
            icms: 18.0,
            iss: 5.0,
            pis_cofins: 9.25,
            cbs: 8.8,
            ibs: 17.7,
        }
    }
}

/// One year of the transition schedule. Weights are percentages of the
/// full rate and need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Calendar year.
    pub ano: i32,
    /// ICMS weight.
    pub icms: f64,
    /// ISS weight.
    pub iss: f64,
    /// IBS weight.
    pub ibs: f64,
    /// CBS weight.
    pub cbs: f64,
    /// PIS weight.
    pub pis: f64,
    /// COFINS weight.
    pub cofins: f64,
    /// Phase label.
    pub fase: String,
}

/// Year-ordered, non-empty schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ScheduleEntry>", into = "Vec<ScheduleEntry>")]
pub struct TransitionSchedule(Vec<ScheduleEntry>);

impl TransitionSchedule {
    /// Build a schedule. Entries are sorted by year; duplicates and an
    /// empty table are rejected.
    pub fn new(mut entries: Vec<ScheduleEntry>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::Invalid("transition schedule is empty".into()));
        }
        entries.sort_by_key(|e| e.ano);
        if let Some(pair) = entries.windows(2).find(|w| w[0].ano == w[1].ano) {
            return Err(ConfigError::Invalid(format!(
                "transition schedule lists year {} twice",
                pair[0].ano
            )));
        }
        Ok(Self(entries))
    }

    /// Row for `ano`, if scheduled.
    pub fn get(&self, ano: i32) -> Option<&ScheduleEntry> {
        self.0.iter().find(|e| e.ano == ano)
    }

    /// Earliest row.
    pub fn first(&self) -> &ScheduleEntry {
        // Non-empty by construction.
        &self.0[0]
    }

    /// All rows in year order.
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.0
    }
}

impl TryFrom<Vec<ScheduleEntry>> for TransitionSchedule {
    type Error = ConfigError;

    fn try_from(value: Vec<ScheduleEntry>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TransitionSchedule> for Vec<ScheduleEntry> {
    fn from(value: TransitionSchedule) -> Self {
        value.0
    }
}

impl Default for TransitionSchedule {
    fn default() -> Self {
        let row = |ano, icms: f64, ibs, cbs, pis: f64, fase: &str| ScheduleEntry {
            ano,
            icms,
            iss: icms,
            ibs,
            cbs,
            pis,
            cofins: pis,
            fase: fase.to_string(),
        };
        Self(vec![
            row(2026, 100.0, 0.0, 0.0, 100.0, "Teste CBS"),
            row(2027, 100.0, 0.1, 0.9, 100.0, "Teste IBS/CBS"),
            row(2028, 100.0, 0.1, 0.9, 100.0, "Teste IBS/CBS"),
            row(2029, 90.0, 10.0, 100.0, 0.0, "Início Transição"),
            row(2030, 80.0, 20.0, 100.0, 0.0, "Transição 20%"),
            row(2031, 70.0, 30.0, 100.0, 0.0, "Transição 30%"),
            row(2032, 60.0, 40.0, 100.0, 0.0, "Transição 40%"),
            row(2033, 0.0, 100.0, 100.0, 0.0, "Transição Completa"),
        ])
    }
}

/// Transition blender reference data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Full-weight rates.
    pub rates: TransitionRates,
    /// Year-by-year weights.
    pub schedule: TransitionSchedule,
}
