#![deny(missing_docs)]

//! # fisco-core: Foundational Types for the Fiscal Engine
//!
//! Everything the calculators share and nothing they compute:
//!
//! - [`numeric`]: locale-aware decimal normalization and cent rounding.
//! - [`jurisdiction`]: the 27 UFs and their regions.
//! - [`canonical`] and [`fingerprint`]: the audit checksum attached to
//!   every result. [`CanonicalInput`] is the sole path into [`Fingerprint`].
//! - [`memory`]: the step-by-step calculation trail.
//! - [`error`]: the validation / parse / calculation error taxonomy.
//!
//! No I/O, no clocks, no shared mutable state.

pub mod canonical;
pub mod error;
pub mod fingerprint;
pub mod jurisdiction;
pub mod memory;
pub mod numeric;

pub use canonical::CanonicalInput;
pub use error::{CalculationError, ParseError, ValidationError};
pub use fingerprint::{Fingerprint, FingerprintDomain};
pub use jurisdiction::{Region, Uf};
pub use memory::{MemoryStep, MemoryTrail};
pub use numeric::{normalize, round2, DecimalInput};
