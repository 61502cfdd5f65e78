//! # Jurisdictions
//!
//! The 27 Brazilian federative units ([`Uf`]) and the five geographic
//! [`Region`]s used by the interstate ICMS rate rules.
//!
//! UFs serialize as their two-letter uppercase code (`"SP"`), and parse
//! case-insensitively with surrounding whitespace ignored, because NFe
//! documents and web forms are not consistent about either.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Geographic region of a UF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// Norte.
    Norte,
    /// Nordeste.
    Nordeste,
    /// Centro-Oeste.
    CentroOeste,
    /// Sudeste.
    Sudeste,
    /// Sul.
    Sul,
}

impl Region {
    /// Return the string representation of this region.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Norte => "norte",
            Self::Nordeste => "nordeste",
            Self::CentroOeste => "centro_oeste",
            Self::Sudeste => "sudeste",
            Self::Sul => "sul",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Brazilian federative unit (state or the Federal District).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Uf {
    /// Acre.
    Ac,
    /// Alagoas.
    Al,
    /// Amapá.
    Ap,
    /// Amazonas.
    Am,
    /// Bahia.
    Ba,
    /// Ceará.
    Ce,
    /// Distrito Federal.
    Df,
    /// Espírito Santo.
    Es,
    /// Goiás.
    Go,
    /// Maranhão.
    Ma,
    /// Mato Grosso.
    Mt,
    /// Mato Grosso do Sul.
    Ms,
    /// Minas Gerais.
    Mg,
    /// Pará.
    Pa,
    /// Paraíba.
    Pb,
    /// Paraná.
    Pr,
    /// Pernambuco.
    Pe,
    /// Piauí.
    Pi,
    /// Rio de Janeiro.
    Rj,
    /// Rio Grande do Norte.
    Rn,
    /// Rio Grande do Sul.
    Rs,
    /// Rondônia.
    Ro,
    /// Roraima.
    Rr,
    /// Santa Catarina.
    Sc,
    /// São Paulo.
    Sp,
    /// Sergipe.
    Se,
    /// Tocantins.
    To,
}

impl Uf {
    /// Two-letter code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ac => "AC",
            Self::Al => "AL",
            Self::Ap => "AP",
            Self::Am => "AM",
            Self::Ba => "BA",
            Self::Ce => "CE",
            Self::Df => "DF",
            Self::Es => "ES",
            Self::Go => "GO",
            Self::Ma => "MA",
            Self::Mt => "MT",
            Self::Ms => "MS",
            Self::Mg => "MG",
            Self::Pa => "PA",
            Self::Pb => "PB",
            Self::Pr => "PR",
            Self::Pe => "PE",
            Self::Pi => "PI",
            Self::Rj => "RJ",
            Self::Rn => "RN",
            Self::Rs => "RS",
            Self::Ro => "RO",
            Self::Rr => "RR",
            Self::Sc => "SC",
            Self::Sp => "SP",
            Self::Se => "SE",
            Self::To => "TO",
        }
    }

    /// Full state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ac => "Acre",
            Self::Al => "Alagoas",
            Self::Ap => "Amapá",
            Self::Am => "Amazonas",
            Self::Ba => "Bahia",
            Self::Ce => "Ceará",
            Self::Df => "Distrito Federal",
            Self::Es => "Espírito Santo",
            Self::Go => "Goiás",
            Self::Ma => "Maranhão",
            Self::Mt => "Mato Grosso",
            Self::Ms => "Mato Grosso do Sul",
            Self::Mg => "Minas Gerais",
            Self::Pa => "Pará",
            Self::Pb => "Paraíba",
            Self::Pr => "Paraná",
            Self::Pe => "Pernambuco",
            Self::Pi => "Piauí",
            Self::Rj => "Rio de Janeiro",
            Self::Rn => "Rio Grande do Norte",
            Self::Rs => "Rio Grande do Sul",
            Self::Ro => "Rondônia",
            Self::Rr => "Roraima",
            Self::Sc => "Santa Catarina",
            Self::Sp => "São Paulo",
            Self::Se => "Sergipe",
            Self::To => "Tocantins",
        }
    }

    /// Geographic region.
    pub fn region(&self) -> Region {
        match self {
            Self::Ac | Self::Ap | Self::Am | Self::Pa | Self::Ro | Self::Rr | Self::To => {
                Region::Norte
            }
            Self::Al
            | Self::Ba
            | Self::Ce
            | Self::Ma
            | Self::Pb
            | Self::Pe
            | Self::Pi
            | Self::Rn
            | Self::Se => Region::Nordeste,
            Self::Df | Self::Go | Self::Mt | Self::Ms => Region::CentroOeste,
            Self::Es | Self::Mg | Self::Rj | Self::Sp => Region::Sudeste,
            Self::Pr | Self::Rs | Self::Sc => Region::Sul,
        }
    }

    /// Return all 27 UFs in declaration order.
    pub fn all() -> &'static [Uf] {
        &[
            Self::Ac,
            Self::Al,
            Self::Ap,
            Self::Am,
            Self::Ba,
            Self::Ce,
            Self::Df,
            Self::Es,
            Self::Go,
            Self::Ma,
            Self::Mt,
            Self::Ms,
            Self::Mg,
            Self::Pa,
            Self::Pb,
            Self::Pr,
            Self::Pe,
            Self::Pi,
            Self::Rj,
            Self::Rn,
            Self::Rs,
            Self::Ro,
            Self::Rr,
            Self::Sc,
            Self::Sp,
            Self::Se,
            Self::To,
        ]
    }

    /// Parse a UF code, naming `field` in the error when it is unknown.
    pub fn parse_field(field: &'static str, code: &str) -> Result<Self, ValidationError> {
        code.parse().map_err(|_| ValidationError::UnknownValue {
            field,
            value: code.to_string(),
        })
    }
}

impl std::fmt::Display for Uf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a UF code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown UF code: \"{0}\"")]
pub struct UnknownUf(pub String);

impl std::str::FromStr for Uf {
    type Err = UnknownUf;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Self::all()
            .iter()
            .copied()
            .find(|uf| uf.as_str() == code)
            .ok_or_else(|| UnknownUf(s.to_string()))
    }
}
