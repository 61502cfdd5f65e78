//! # API Route Modules
//!
//! - `calc`: stateless calculators (DIFAL, ICMS-ST, withholding, IBS/CBS
//!   transition), each returning its memory trail and fingerprint.
//! - `nfe`: NFe XML extraction, batch processing and DIFAL reporting.

pub mod calc;
pub mod nfe;
