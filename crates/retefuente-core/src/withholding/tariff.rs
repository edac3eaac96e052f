use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::RetencionError;
use crate::types::*;
use crate::withholding::catalog::ConceptCatalog;
use crate::RetencionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One computed withholding, for a single issuer or one consortium member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationLine {
    pub subject_tax_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    pub subject_type: SubjectType,
    /// Normalized consortium share; absent on single-issuer lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_pct: Option<Percentage>,
    pub allocated_base: Money,
    /// Recorded even when the base is under the minimum and nothing is withheld.
    pub applied_rate: Rate,
    pub withholding_amount: Money,
    pub rule_applied: String,
    pub applicable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub concept_id: String,
    pub base: Money,
    pub subject: TaxSubjectProfile,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Decide whether `concept_id` withholds on `base` for `subject`, and how much.
///
/// Fails with `UnknownConcept` when the concept is not catalogued and with
/// `InapplicableConcept` when the rule excludes the subject's type. A base
/// under the rule's minimum still yields a line, marked not applicable with a
/// zero amount.
pub fn evaluate(
    catalog: &ConceptCatalog,
    concept_id: &str,
    base: Money,
    subject: &TaxSubjectProfile,
) -> RetencionResult<LiquidationLine> {
    if base < dec!(0) {
        return Err(RetencionError::invalid_input(
            "base",
            "Taxable base cannot be negative",
        ));
    }

    let rule = catalog.lookup(concept_id)?;
    if !rule.applies_to(subject.subject_type) {
        return Err(RetencionError::InapplicableConcept {
            concept_id: rule.concept_id.clone(),
            subject_type: subject.subject_type.to_string(),
        });
    }

    let applied_rate = rule.rate_for(subject.subject_type);
    let applicable = base >= rule.minimum_base;
    let withholding_amount = if applicable {
        round_currency(base * applied_rate)
    } else {
        Decimal::new(0, CURRENCY_DP)
    };

    tracing::debug!(
        concept = %rule.concept_id,
        tax_id = %subject.tax_id,
        subject_type = %subject.subject_type,
        base = %base,
        rate = %applied_rate,
        amount = %withholding_amount,
        applicable,
        "Tariff evaluated"
    );

    Ok(LiquidationLine {
        subject_tax_id: subject.tax_id.clone(),
        subject_name: None,
        subject_type: subject.subject_type,
        share_pct: None,
        allocated_base: base,
        applied_rate,
        withholding_amount,
        rule_applied: rule.concept_id.clone(),
        applicable,
    })
}

/// Evaluate one concept and wrap the line in the standard output envelope.
pub fn evaluate_concept(
    catalog: &ConceptCatalog,
    input: &EvaluationInput,
) -> RetencionResult<ComputationOutput<LiquidationLine>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let line = evaluate(catalog, &input.concept_id, input.base, &input.subject)?;
    if !line.applicable {
        let minimum = catalog.lookup(&input.concept_id)?.minimum_base;
        warnings.push(format!(
            "Base {} is under the {} minimum of {}; no withholding applies.",
            input.base, line.rule_applied, minimum
        ));
    }

    let assumptions = serde_json::json!({
        "concept_id": input.concept_id,
        "base": input.base.to_string(),
        "subject_type": input.subject.subject_type,
        "rounding": "half-up to 2 decimal places",
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Single-concept withholding: catalog rate applied to base at or above the minimum",
        &assumptions,
        warnings,
        elapsed,
        line,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::withholding::catalog::ConceptRule;

    fn catalog() -> ConceptCatalog {
        ConceptCatalog::from_rules(vec![
            ConceptRule::new("servicios", dec!(0.035), dec!(2_000_000), []).unwrap(),
            ConceptRule::new(
                "vigilancia",
                dec!(0.02),
                dec!(0),
                [SubjectType::LegalEntity, SubjectType::LargeTaxpayer],
            )
            .unwrap(),
            ConceptRule::new("honorarios", dec!(0.11), dec!(0), [])
                .unwrap()
                .with_rate_override(SubjectType::NaturalPerson, dec!(0.10))
                .unwrap(),
        ])
        .unwrap()
    }

    fn legal_entity() -> TaxSubjectProfile {
        TaxSubjectProfile::new(SubjectType::LegalEntity, "900111222")
    }

    #[test]
    fn test_base_above_minimum_withholds() {
        let line = evaluate(&catalog(), "servicios", dec!(5_000_000), &legal_entity()).unwrap();

        assert!(line.applicable);
        assert_eq!(line.withholding_amount, dec!(175_000.00));
        assert_eq!(line.applied_rate, dec!(0.035));
        assert_eq!(line.rule_applied, "servicios");
        assert_eq!(line.allocated_base, dec!(5_000_000));
        assert_eq!(line.subject_tax_id, "900111222");
    }

    #[test]
    fn test_base_below_minimum_not_applicable() {
        let line = evaluate(&catalog(), "servicios", dec!(1_000_000), &legal_entity()).unwrap();

        assert!(!line.applicable);
        assert_eq!(line.withholding_amount, dec!(0));
        assert_eq!(line.applied_rate, dec!(0.035));
    }

    #[test]
    fn test_base_exactly_at_minimum_applies() {
        let line = evaluate(&catalog(), "servicios", dec!(2_000_000), &legal_entity()).unwrap();

        assert!(line.applicable);
        assert_eq!(line.withholding_amount, dec!(70_000));
    }

    #[test]
    fn test_rounding_half_up() {
        // 1_234_567.89 * 0.02 = 24_691.3578
        let line = evaluate(&catalog(), "vigilancia", dec!(1_234_567.89), &legal_entity()).unwrap();
        assert_eq!(line.withholding_amount, dec!(24_691.36));

        // 2_999_700 * 0.035 = 104_989.5
        let line = evaluate(&catalog(), "servicios", dec!(2_999_700), &legal_entity()).unwrap();
        assert_eq!(line.withholding_amount, dec!(104_989.50));

        // 100.25 * 0.02 = 2.005 -> 2.01
        let line = evaluate(&catalog(), "vigilancia", dec!(100.25), &legal_entity()).unwrap();
        assert_eq!(line.withholding_amount, dec!(2.01));
    }

    #[test]
    fn test_inapplicable_subject_type() {
        let person = TaxSubjectProfile::new(SubjectType::NaturalPerson, "1020304050");
        match evaluate(&catalog(), "vigilancia", dec!(1_000_000), &person) {
            Err(RetencionError::InapplicableConcept {
                concept_id,
                subject_type,
            }) => {
                assert_eq!(concept_id, "vigilancia");
                assert_eq!(subject_type, "natural_person");
            }
            other => panic!("Expected InapplicableConcept, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_concept_never_defaults_to_zero() {
        match evaluate(&catalog(), "dividendos", dec!(1_000_000), &legal_entity()) {
            Err(RetencionError::UnknownConcept { concept_id }) => {
                assert_eq!(concept_id, "dividendos")
            }
            other => panic!("Expected UnknownConcept, got {:?}", other),
        }
    }

    #[test]
    fn test_subject_rate_override() {
        let person = TaxSubjectProfile::new(SubjectType::NaturalPerson, "1020304050");
        let line = evaluate(&catalog(), "honorarios", dec!(10_000_000), &person).unwrap();
        assert_eq!(line.applied_rate, dec!(0.10));
        assert_eq!(line.withholding_amount, dec!(1_000_000));

        let line = evaluate(&catalog(), "honorarios", dec!(10_000_000), &legal_entity()).unwrap();
        assert_eq!(line.withholding_amount, dec!(1_100_000));
    }

    #[test]
    fn test_negative_base_rejected() {
        match evaluate(&catalog(), "servicios", dec!(-1), &legal_entity()) {
            Err(RetencionError::InvalidInput { field, .. }) => assert_eq!(field, "base"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_warns_under_minimum() {
        let input = EvaluationInput {
            concept_id: "servicios".to_string(),
            base: dec!(1_000_000),
            subject: legal_entity(),
        };
        let output = evaluate_concept(&catalog(), &input).unwrap();

        assert!(!output.result.applicable);
        assert!(output.warnings.iter().any(|w| w.contains("under the servicios minimum")));
        assert_eq!(output.metadata.precision, "rust_decimal_128bit");
    }
}
