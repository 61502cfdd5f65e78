#![deny(missing_docs)]

//! # fisco-engine: Statutory Tax Calculators
//!
//! Pure, synchronous calculators over an injected, read-only
//! [`EngineConfig`]:
//!
//! - [`difal`]: ICMS rate differential, single and dual base.
//! - [`icms_st`]: tax substitution with MVA and MVA ajustada.
//! - [`mva`]: agreed ST margin by NCM and destination.
//! - [`withholding`]: PIS/COFINS/CSLL/IRRF on service invoices.
//! - [`transition`]: the 2026–2033 IBS/CBS blend and the full-rate reform.
//!
//! Every calculator validates before computing, keeps full precision
//! internally and rounds its result to the cent. The `*_with_memory`
//! variants return an [`Audited`] envelope carrying the memory trail and
//! fingerprint.
//!
//! ## Usage
//!
//! ```
//! use fisco_core::Uf;
//! use fisco_engine::{DifalInput, EngineConfig, FiscalEngine};
//!
//! let engine = FiscalEngine::new(EngineConfig::default());
//! let r = engine
//!     .difal()
//!     .calculate(&DifalInput::new(1000.0, 12.0, 17.0, Uf::Sp))
//!     .unwrap();
//! assert_eq!(r.total_difal, 60.24);
//! ```

pub mod audit;
pub mod config;
pub mod difal;
pub mod icms_st;
pub mod mva;
pub mod transition;
pub mod withholding;

pub use audit::Audited;
pub use config::{
    ConfigError, EngineConfig, MvaEntry, MvaTable, RateTable, ScheduleEntry, TransitionConfig,
    TransitionRates, TransitionSchedule, WithholdingRate, WithholdingRates,
};
pub use difal::{DifalCalculator, DifalInput, DifalResult, MethodComparison, Methodology};
pub use icms_st::{IcmsStInput, IcmsStResult, MvaComparison};
pub use mva::{MvaCatalog, MvaLookup};
pub use transition::{
    CurrentBurden, OperationType, ReformComparison, ReformInput, ReformResult, TransitionBlender,
    TransitionResult,
};
pub use withholding::{WithholdingEngine, WithholdingInput, WithholdingItem, WithholdingResult};

use fisco_core::CalculationError;

/// Calculators bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct FiscalEngine {
    config: EngineConfig,
}

impl FiscalEngine {
    /// Wrap a configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// DIFAL calculator.
    pub fn difal(&self) -> DifalCalculator<'_> {
        DifalCalculator::new(&self.config.rates)
    }

    /// MVA lookup by NCM.
    pub fn mva(&self) -> MvaCatalog<'_> {
        MvaCatalog::new(&self.config.mva, &self.config.rates)
    }

    /// Withholding calculator.
    pub fn withholding(&self) -> WithholdingEngine<'_> {
        WithholdingEngine::new(&self.config.withholding)
    }

    /// Transition blender.
    pub fn transition(&self) -> TransitionBlender<'_> {
        TransitionBlender::new(&self.config.transition)
    }
}

/// Reject non-finite values produced by a calculation step.
pub(crate) fn ensure_finite(operation: &'static str, values: &[f64]) -> Result<(), CalculationError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(v) => Err(CalculationError::ArithmeticEdgeCase {
            operation,
            detail: format!("non-finite intermediate value {v}"),
        }),
        None => Ok(()),
    }
}
