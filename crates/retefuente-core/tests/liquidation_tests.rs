use pretty_assertions::assert_eq;
use retefuente_core::withholding::{
    liquidate, ClassifiedInvoice, ConceptCatalog, ConceptRule, Participant,
};
use retefuente_core::{EngineConfig, ErrorKind, Money, SubjectType, TaxSubjectProfile};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn catalog() -> ConceptCatalog {
    ConceptCatalog::from_rules(vec![
        ConceptRule::new("servicios_3_5", dec!(0.035), dec!(2_000_000), [])
            .unwrap()
            .with_description("Servicios 3.5% con base mínima de 2.000.000"),
        ConceptRule::new(
            "vigilancia",
            dec!(0.02),
            dec!(0),
            [SubjectType::LegalEntity, SubjectType::LargeTaxpayer],
        )
        .unwrap(),
    ])
    .unwrap()
}

fn entity(tax_id: &str) -> TaxSubjectProfile {
    TaxSubjectProfile::new(SubjectType::LegalEntity, tax_id)
}

fn member(name: &str, tax_id: &str, share: Decimal) -> Participant {
    Participant::new(name, entity(tax_id), share).unwrap()
}

// ===========================================================================
// Reference scenarios
// ===========================================================================

#[test]
fn test_scenario_a_single_issuer_above_minimum() {
    let invoice = ClassifiedInvoice::single("servicios_3_5", dec!(5_000_000), entity("900100200"));
    let result = liquidate(&catalog(), &EngineConfig::default(), &invoice).unwrap();

    assert_eq!(result.lines.len(), 1);
    let line = &result.lines[0];
    assert!(line.applicable);
    assert_eq!(line.withholding_amount, dec!(175_000.00));
    assert_eq!(result.total_withholding, dec!(175_000.00));
    assert_eq!(result.total_base, dec!(5_000_000));
}

#[test]
fn test_scenario_b_single_issuer_below_minimum() {
    let invoice = ClassifiedInvoice::single("servicios_3_5", dec!(1_000_000), entity("900100200"));
    let result = liquidate(&catalog(), &EngineConfig::default(), &invoice).unwrap();

    let line = &result.lines[0];
    assert!(!line.applicable);
    assert_eq!(line.withholding_amount, dec!(0.00));
    assert_eq!(line.applied_rate, dec!(0.035));
    assert_eq!(result.total_withholding, dec!(0));
}

#[test]
fn test_scenario_c_three_member_consortium() {
    let participants = vec![
        member("Ingeniería Andina SAS", "900000001", dec!(33.33)),
        member("Obras del Caribe SAS", "900000002", dec!(33.33)),
        member("Pacífico Constructores SAS", "900000003", dec!(33.34)),
    ];
    let invoice = ClassifiedInvoice::consortium("servicios_3_5", dec!(9_000_000), participants);
    let result = liquidate(&catalog(), &EngineConfig::default(), &invoice).unwrap();

    let bases: Vec<Money> = result.lines.iter().map(|l| l.allocated_base).collect();
    assert_eq!(bases, vec![dec!(2_999_700), dec!(2_999_700), dec!(3_000_600)]);

    let amounts: Vec<Money> = result.lines.iter().map(|l| l.withholding_amount).collect();
    assert_eq!(
        amounts,
        vec![dec!(104_989.50), dec!(104_989.50), dec!(105_021.00)]
    );
    assert_eq!(result.total_withholding, dec!(315_000.00));

    let single = ClassifiedInvoice::single("servicios_3_5", dec!(9_000_000), entity("900000000"));
    let single_result = liquidate(&catalog(), &EngineConfig::default(), &single).unwrap();
    assert_eq!(result.total_withholding, single_result.total_withholding);
}

#[test]
fn test_scenario_d_share_sum_far_from_100() {
    let participants = vec![
        member("A", "1", dec!(32)),
        member("B", "2", dec!(32)),
        member("C", "3", dec!(32)),
    ];
    let invoice = ClassifiedInvoice::consortium("servicios_3_5", dec!(9_000_000), participants);
    let err = liquidate(&catalog(), &EngineConfig::default(), &invoice).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidShareSum);
}

#[test]
fn test_scenario_e_single_member_consortium() {
    let participants = vec![member("Solo SAS", "1", dec!(100))];
    let invoice = ClassifiedInvoice::consortium("servicios_3_5", dec!(9_000_000), participants);
    let err = liquidate(&catalog(), &EngineConfig::default(), &invoice).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientParticipants);
}

// ===========================================================================
// Mixed-nature consortium
// ===========================================================================

#[test]
fn test_member_type_excluded_by_concept_names_member() {
    let participants = vec![
        member("Seguridad Total SAS", "900555001", dec!(70)),
        Participant::new(
            "Juan Pérez",
            TaxSubjectProfile::new(SubjectType::NaturalPerson, "79111222"),
            dec!(30),
        )
        .unwrap(),
    ];
    let invoice = ClassifiedInvoice::consortium("vigilancia", dec!(3_000_000), participants);
    let err = liquidate(&catalog(), &EngineConfig::default(), &invoice).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InapplicableConcept);
    let msg = err.to_string();
    assert!(msg.contains("Participant 1"), "{}", msg);
    assert!(msg.contains("79111222"), "{}", msg);
}

#[test]
fn test_large_taxpayer_and_entity_share_concept() {
    let participants = vec![
        member("Seguridad Total SAS", "900555001", dec!(70)),
        Participant::new(
            "Grupo Nacional SA",
            TaxSubjectProfile::new(SubjectType::LargeTaxpayer, "860000001"),
            dec!(30),
        )
        .unwrap(),
    ];
    let invoice = ClassifiedInvoice::consortium("vigilancia", dec!(3_000_000), participants);
    let result = liquidate(&catalog(), &EngineConfig::default(), &invoice).unwrap();

    assert_eq!(result.lines[0].withholding_amount, dec!(42_000));
    assert_eq!(result.lines[1].withholding_amount, dec!(18_000));
    assert_eq!(result.lines[1].subject_type, SubjectType::LargeTaxpayer);
    assert_eq!(result.total_withholding, dec!(60_000));
}

// ===========================================================================
// Built-in catalog
// ===========================================================================

#[test]
fn test_default_catalog_honorarios_natural_person() {
    let config = EngineConfig::default();
    let catalog = ConceptCatalog::colombian_default(&config).unwrap();
    let invoice = ClassifiedInvoice::single(
        "honorarios",
        dec!(3_000_000),
        TaxSubjectProfile::new(SubjectType::NaturalPerson, "1020304050"),
    );
    let result = liquidate(&catalog, &config, &invoice).unwrap();

    assert_eq!(result.lines[0].applied_rate, dec!(0.10));
    assert_eq!(result.total_withholding, dec!(300_000));
}

#[test]
fn test_default_catalog_simple_regime_excluded_from_compras() {
    let config = EngineConfig::default();
    let catalog = ConceptCatalog::colombian_default(&config).unwrap();
    let invoice = ClassifiedInvoice::single(
        "compras_generales",
        dec!(3_000_000),
        TaxSubjectProfile::new(SubjectType::SimpleRegime, "901000000"),
    );
    let err = liquidate(&catalog, &config, &invoice).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InapplicableConcept);
}

#[test]
fn test_default_catalog_minimum_follows_uvt_value() {
    // compras_generales: 10 UVT. 480_000 is under 10 * 49_799 but over 10 * 47_065.
    let invoice = ClassifiedInvoice::single("compras_generales", dec!(480_000), entity("900"));

    let current = EngineConfig::default();
    let catalog = ConceptCatalog::colombian_default(&current).unwrap();
    let result = liquidate(&catalog, &current, &invoice).unwrap();
    assert!(!result.lines[0].applicable);

    let previous = EngineConfig {
        uvt_value: dec!(47_065),
        ..EngineConfig::default()
    };
    let catalog = ConceptCatalog::colombian_default(&previous).unwrap();
    let result = liquidate(&catalog, &previous, &invoice).unwrap();
    assert!(result.lines[0].applicable);
    assert_eq!(result.total_withholding, dec!(12_000));
}
