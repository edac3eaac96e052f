use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RetencionError;

/// All monetary values, in Colombian pesos. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.035 = 3.5%). Never as percentages.
pub type Rate = Decimal;

/// Participation shares on a 0-100 scale (33.33 = 33.33%).
pub type Percentage = Decimal;

/// Decimal places of the peso minor unit.
pub const CURRENCY_DP: u32 = 2;

/// Round to currency minor units, half-up.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Tax nature of an invoice issuer or consortium member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    #[serde(alias = "persona_natural")]
    NaturalPerson,
    #[serde(alias = "persona_juridica")]
    LegalEntity,
    #[serde(alias = "gran_contribuyente")]
    LargeTaxpayer,
    #[serde(alias = "regimen_especial")]
    SpecialRegime,
    #[serde(alias = "regimen_simple")]
    SimpleRegime,
}

impl SubjectType {
    pub const ALL: [SubjectType; 5] = [
        SubjectType::NaturalPerson,
        SubjectType::LegalEntity,
        SubjectType::LargeTaxpayer,
        SubjectType::SpecialRegime,
        SubjectType::SimpleRegime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::NaturalPerson => "natural_person",
            SubjectType::LegalEntity => "legal_entity",
            SubjectType::LargeTaxpayer => "large_taxpayer",
            SubjectType::SpecialRegime => "special_regime",
            SubjectType::SimpleRegime => "simple_regime",
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectType {
    type Err = RetencionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "natural_person" | "persona_natural" => Ok(SubjectType::NaturalPerson),
            "legal_entity" | "persona_juridica" => Ok(SubjectType::LegalEntity),
            "large_taxpayer" | "gran_contribuyente" => Ok(SubjectType::LargeTaxpayer),
            "special_regime" | "regimen_especial" => Ok(SubjectType::SpecialRegime),
            "simple_regime" | "regimen_simple" => Ok(SubjectType::SimpleRegime),
            _ => Err(RetencionError::UnrecognizedSubjectType(s.to_string())),
        }
    }
}

/// An invoice issuer or consortium member as seen by the tariff rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSubjectProfile {
    pub subject_type: SubjectType,
    /// NIT or cédula. Reporting only; never drives computation.
    pub tax_id: String,
}

impl TaxSubjectProfile {
    pub fn new(subject_type: SubjectType, tax_id: impl Into<String>) -> Self {
        Self {
            subject_type,
            tax_id: tax_id.into(),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
