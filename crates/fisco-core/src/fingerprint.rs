//! # Audit Fingerprints
//!
//! A [`Fingerprint`] is a short, deterministic identifier attached to every
//! calculation result: `<PREFIX>-<HEX>`, where the hex part is at least 12
//! uppercase digits.
//!
//! ## Algorithm
//!
//! Two 32-bit multiplicative lanes consume the UTF-16 code units of the
//! [`CanonicalInput`] string, each finishes with an xor-shift/multiply
//! avalanche, and the lanes combine into a 53-bit integer
//! (`(h2 & 0x1FFFFF) << 32 | h1`).
//!
//! This is a reproducibility checksum, not a cryptographic digest. It must
//! never gate access or authenticate anything.

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalInput;

const SEED_1: u32 = 0xDEAD_BEEF;
const SEED_2: u32 = 0x41C6_CE57;

/// Minimum number of hex digits after the prefix.
pub const MIN_HEX_DIGITS: usize = 12;

/// Which calculator produced a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintDomain {
    /// DIFAL calculation.
    Difal,
    /// ICMS substitution.
    IcmsSt,
    /// Federal withholding on services.
    Retencoes,
    /// Reform transition blend.
    Transicao,
    /// MVA lookup by NCM.
    Ncm,
    /// IBS/CBS under the full reform.
    IbsCbs,
}

impl FingerprintDomain {
    /// The tag that prefixes fingerprints of this domain.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Difal => "DIFAL",
            Self::IcmsSt => "ICMSST",
            Self::Retencoes => "RETENC",
            Self::Transicao => "TRANS",
            Self::Ncm => "NCM",
            Self::IbsCbs => "IBSCBS",
        }
    }

    /// Return all domains.
    pub fn all() -> &'static [FingerprintDomain] {
        &[
            Self::Difal,
            Self::IcmsSt,
            Self::Retencoes,
            Self::Transicao,
            Self::Ncm,
            Self::IbsCbs,
        ]
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::all().iter().copied().find(|d| d.prefix() == prefix)
    }
}

impl std::fmt::Display for FingerprintDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Two-lane 53-bit mix of a string's UTF-16 code units.
pub fn mix53(input: &str) -> u64 {
    let mut h1 = SEED_1;
    let mut h2 = SEED_2;
    for unit in input.encode_utf16() {
        let c = u32::from(unit);
        h1 = (h1 ^ c).wrapping_mul(2_654_435_761);
        h2 = (h2 ^ c).wrapping_mul(1_597_334_677);
    }
    h1 = (h1 ^ (h1 >> 16)).wrapping_mul(2_246_822_507)
        ^ (h2 ^ (h2 >> 13)).wrapping_mul(3_266_489_909);
    h2 = (h2 ^ (h2 >> 16)).wrapping_mul(2_246_822_507)
        ^ (h1 ^ (h1 >> 13)).wrapping_mul(3_266_489_909);
    (u64::from(h2 & 0x001F_FFFF) << 32) | u64::from(h1)
}

/// A domain-tagged audit fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint {
    domain: FingerprintDomain,
    value: String,
}

impl Fingerprint {
    /// Compute the fingerprint of a canonical input.
    pub fn compute(domain: FingerprintDomain, input: &CanonicalInput) -> Self {
        let hex = format!("{:0width$X}", mix53(input.as_str()), width = MIN_HEX_DIGITS);
        Self {
            domain,
            value: format!("{}-{}", domain.prefix(), hex),
        }
    }

    /// Recompute from `input` and compare.
    pub fn verify(&self, domain: FingerprintDomain, input: &CanonicalInput) -> bool {
        *self == Self::compute(domain, input)
    }

    /// The domain this fingerprint was computed or parsed under.
    pub fn domain(&self) -> FingerprintDomain {
        self.domain
    }

    /// The full `PREFIX-HEX` string.
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// A string that does not have the `PREFIX-HEX` shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed fingerprint: \"{0}\"")]
pub struct MalformedFingerprint(pub String);

impl std::str::FromStr for Fingerprint {
    type Err = MalformedFingerprint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedFingerprint(s.to_string());
        let (prefix, hex) = s.split_once('-').ok_or_else(malformed)?;
        let domain = FingerprintDomain::from_prefix(prefix).ok_or_else(malformed)?;
        // 53 bits never need more than 14 hex digits.
        let well_formed = (MIN_HEX_DIGITS..=14).contains(&hex.len())
            && hex
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
        if !well_formed {
            return Err(malformed());
        }
        Ok(Self {
            domain,
            value: s.to_string(),
        })
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = MalformedFingerprint;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.value
    }
}
