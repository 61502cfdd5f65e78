//! # Audit Envelope
//!
//! Wraps a calculator result with the memory trail that explains it and the
//! fingerprint of the inputs that produced it. The envelope holds no clock
//! reading; callers that want a timestamp add it themselves.

use fisco_core::{CanonicalInput, Fingerprint, FingerprintDomain, MemoryTrail};
use serde::{Deserialize, Serialize};

/// A result together with its memory trail and audit fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audited<T> {
    /// The rounded calculation result.
    pub resultado: T,
    /// Step-by-step derivation.
    pub memoria: MemoryTrail,
    /// Fingerprint of the defining inputs.
    pub hash: Fingerprint,
    /// Statutory basis of the calculation.
    pub base_legal: String,
}

impl<T> Audited<T> {
    /// Seal a result: fingerprint `canonical` under `domain`.
    pub fn seal(
        resultado: T,
        memoria: MemoryTrail,
        domain: FingerprintDomain,
        canonical: &CanonicalInput,
        base_legal: impl Into<String>,
    ) -> Self {
        Self {
            resultado,
            memoria,
            hash: Fingerprint::compute(domain, canonical),
            base_legal: base_legal.into(),
        }
    }
}
