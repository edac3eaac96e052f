use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::EngineConfig;
use crate::error::RetencionError;
use crate::types::*;
use crate::RetencionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Resolved, immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRule {
    pub concept_id: String,
    pub description: String,
    pub rate: Rate,
    /// Subject-specific rates that replace `rate` for that subject type.
    pub rate_overrides: BTreeMap<SubjectType, Rate>,
    pub minimum_base: Money,
    /// Empty means the concept applies to every subject type.
    pub applicable_subject_types: BTreeSet<SubjectType>,
}

/// Load-time form of a concept, as written in a catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptDefinition {
    pub concept_id: String,
    #[serde(default)]
    pub description: String,
    pub rate: Rate,
    #[serde(default)]
    pub rate_overrides: BTreeMap<SubjectType, Rate>,
    /// Minimum base in pesos. Mutually exclusive with `minimum_base_uvt`.
    #[serde(default)]
    pub minimum_base: Option<Money>,
    /// Minimum base in UVT, converted to pesos at load time.
    #[serde(default)]
    pub minimum_base_uvt: Option<Decimal>,
    #[serde(default)]
    pub applicable_subject_types: Vec<SubjectType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDefinition {
    pub concepts: Vec<ConceptDefinition>,
}

/// Process-wide concept table. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ConceptCatalog {
    rules: HashMap<String, ConceptRule>,
}

// ---------------------------------------------------------------------------
// ConceptRule
// ---------------------------------------------------------------------------

impl ConceptRule {
    pub fn new(
        concept_id: impl Into<String>,
        rate: Rate,
        minimum_base: Money,
        applicable_subject_types: impl IntoIterator<Item = SubjectType>,
    ) -> RetencionResult<Self> {
        let rule = Self {
            concept_id: concept_id.into(),
            description: String::new(),
            rate,
            rate_overrides: BTreeMap::new(),
            minimum_base,
            applicable_subject_types: applicable_subject_types.into_iter().collect(),
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_rate_override(
        mut self,
        subject_type: SubjectType,
        rate: Rate,
    ) -> RetencionResult<Self> {
        self.rate_overrides.insert(subject_type, rate);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> RetencionResult<()> {
        if self.concept_id.trim().is_empty() {
            return Err(RetencionError::invalid_input(
                "concept_id",
                "Concept identifier cannot be empty",
            ));
        }
        check_rate(&self.concept_id, "rate", self.rate)?;
        for (subject_type, rate) in &self.rate_overrides {
            check_rate(
                &self.concept_id,
                &format!("rate_overrides.{}", subject_type),
                *rate,
            )?;
        }
        if self.minimum_base < dec!(0) {
            return Err(RetencionError::invalid_input(
                format!("{}.minimum_base", self.concept_id),
                "Minimum base cannot be negative",
            ));
        }
        Ok(())
    }

    pub fn applies_to(&self, subject_type: SubjectType) -> bool {
        self.applicable_subject_types.is_empty()
            || self.applicable_subject_types.contains(&subject_type)
    }

    /// Rate for a given subject type: its override if one exists, else the base rate.
    pub fn rate_for(&self, subject_type: SubjectType) -> Rate {
        self.rate_overrides
            .get(&subject_type)
            .copied()
            .unwrap_or(self.rate)
    }
}

fn check_rate(concept_id: &str, field: &str, rate: Rate) -> RetencionResult<()> {
    if rate < dec!(0) || rate > dec!(1) {
        return Err(RetencionError::invalid_input(
            format!("{}.{}", concept_id, field),
            format!("Rate {} must lie in [0, 1]", rate),
        ));
    }
    Ok(())
}

impl ConceptDefinition {
    /// Resolve into a rule, converting any UVT minimum into pesos.
    pub fn resolve(&self, config: &EngineConfig) -> RetencionResult<ConceptRule> {
        let minimum_base = match (self.minimum_base, self.minimum_base_uvt) {
            (Some(_), Some(_)) => {
                return Err(RetencionError::invalid_input(
                    format!("{}.minimum_base", self.concept_id),
                    "Set either minimum_base or minimum_base_uvt, not both",
                ));
            }
            (Some(pesos), None) => pesos,
            (None, Some(uvt)) => {
                if uvt < dec!(0) {
                    return Err(RetencionError::invalid_input(
                        format!("{}.minimum_base_uvt", self.concept_id),
                        "Minimum base cannot be negative",
                    ));
                }
                round_currency(uvt * config.uvt_value)
            }
            (None, None) => dec!(0),
        };

        let rule = ConceptRule {
            concept_id: self.concept_id.clone(),
            description: self.description.clone(),
            rate: self.rate,
            rate_overrides: self.rate_overrides.clone(),
            minimum_base,
            applicable_subject_types: self.applicable_subject_types.iter().copied().collect(),
        };
        rule.validate()?;
        Ok(rule)
    }
}

// ---------------------------------------------------------------------------
// ConceptCatalog
// ---------------------------------------------------------------------------

impl ConceptCatalog {
    /// Build a catalog. Repeated identifiers are a fatal load error.
    pub fn from_rules(rules: impl IntoIterator<Item = ConceptRule>) -> RetencionResult<Self> {
        let mut map = HashMap::new();
        for rule in rules {
            rule.validate()?;
            if map.contains_key(&rule.concept_id) {
                return Err(RetencionError::DuplicateConcept {
                    concept_id: rule.concept_id,
                });
            }
            map.insert(rule.concept_id.clone(), rule);
        }
        tracing::debug!(concepts = map.len(), "Concept catalog loaded");
        Ok(Self { rules: map })
    }

    pub fn from_definition(
        definition: &CatalogDefinition,
        config: &EngineConfig,
    ) -> RetencionResult<Self> {
        config.validate()?;
        let rules = definition
            .concepts
            .iter()
            .map(|d| d.resolve(config))
            .collect::<RetencionResult<Vec<_>>>()?;
        Self::from_rules(rules)
    }

    pub fn from_json_str(json: &str, config: &EngineConfig) -> RetencionResult<Self> {
        let definition: CatalogDefinition = serde_json::from_str(json)?;
        Self::from_definition(&definition, config)
    }

    /// Built-in table of common Colombian withholding concepts.
    pub fn colombian_default(config: &EngineConfig) -> RetencionResult<Self> {
        Self::from_definition(&default_definition(), config)
    }

    pub fn lookup(&self, concept_id: &str) -> RetencionResult<&ConceptRule> {
        self.rules
            .get(concept_id)
            .ok_or_else(|| RetencionError::UnknownConcept {
                concept_id: concept_id.to_string(),
            })
    }

    /// All rules, sorted by identifier.
    pub fn concepts(&self) -> Vec<&ConceptRule> {
        let mut rules: Vec<&ConceptRule> = self.rules.values().collect();
        rules.sort_by(|a, b| a.concept_id.cmp(&b.concept_id));
        rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

fn concept(
    concept_id: &str,
    description: &str,
    rate: Rate,
    minimum_base_uvt: Decimal,
    applicable: &[SubjectType],
) -> ConceptDefinition {
    ConceptDefinition {
        concept_id: concept_id.to_string(),
        description: description.to_string(),
        rate,
        rate_overrides: BTreeMap::new(),
        minimum_base: None,
        minimum_base_uvt: Some(minimum_base_uvt),
        applicable_subject_types: applicable.to_vec(),
    }
}

/// Declarant rates and UVT minimums in force from mid-2025.
pub fn default_definition() -> CatalogDefinition {
    use SubjectType::*;

    // Régimen Simple taxpayers are not subject to withholding on these concepts.
    const ORDINARY: &[SubjectType] = &[NaturalPerson, LegalEntity, LargeTaxpayer, SpecialRegime];
    const COMPANIES: &[SubjectType] = &[LegalEntity, LargeTaxpayer];

    let mut honorarios = concept(
        "honorarios",
        "Honorarios",
        dec!(0.11),
        dec!(0),
        ORDINARY,
    );
    honorarios.rate_overrides.insert(NaturalPerson, dec!(0.10));

    let mut comisiones = concept(
        "comisiones",
        "Comisiones",
        dec!(0.11),
        dec!(0),
        ORDINARY,
    );
    comisiones.rate_overrides.insert(NaturalPerson, dec!(0.10));

    CatalogDefinition {
        concepts: vec![
            concept("compras_generales", "Compras generales", dec!(0.025), dec!(10), ORDINARY),
            concept("servicios_generales", "Servicios generales", dec!(0.04), dec!(2), ORDINARY),
            honorarios,
            comisiones,
            concept(
                "arrendamiento_inmuebles",
                "Arrendamiento de bienes raíces",
                dec!(0.035),
                dec!(10),
                ORDINARY,
            ),
            concept(
                "arrendamiento_muebles",
                "Arrendamiento de bienes muebles",
                dec!(0.04),
                dec!(0),
                ORDINARY,
            ),
            concept(
                "transporte_carga",
                "Servicio de transporte nacional de carga",
                dec!(0.01),
                dec!(2),
                ORDINARY,
            ),
            concept(
                "transporte_pasajeros",
                "Servicio de transporte nacional de pasajeros terrestre",
                dec!(0.035),
                dec!(10),
                ORDINARY,
            ),
            concept(
                "servicios_temporales",
                "Servicios temporales de empleo sobre AIU",
                dec!(0.01),
                dec!(2),
                COMPANIES,
            ),
            concept(
                "vigilancia_aseo",
                "Servicios de vigilancia y aseo sobre AIU",
                dec!(0.02),
                dec!(2),
                COMPANIES,
            ),
            concept(
                "contratos_construccion",
                "Contratos de construcción y urbanización",
                dec!(0.02),
                dec!(10),
                ORDINARY,
            ),
            concept(
                "hoteles_restaurantes",
                "Servicios de hoteles y restaurantes",
                dec!(0.035),
                dec!(2),
                ORDINARY,
            ),
            concept(
                "licenciamiento_software",
                "Licenciamiento o derecho de uso de software",
                dec!(0.035),
                dec!(0),
                &[],
            ),
            concept(
                "rendimientos_financieros",
                "Rendimientos financieros",
                dec!(0.07),
                dec!(0),
                &[],
            ),
            concept(
                "compras_combustibles",
                "Compra de combustibles derivados del petróleo",
                dec!(0.001),
                dec!(0),
                &[],
            ),
        ],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
