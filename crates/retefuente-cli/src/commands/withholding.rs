use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use retefuente_core::withholding::batch::{self, BatchInput};
use retefuente_core::withholding::liquidation::{self, ClassifiedInvoice};
use retefuente_core::withholding::shares::{self, ShareNormalizationInput};
use retefuente_core::withholding::tariff::{self, EvaluationInput};
use retefuente_core::{SubjectType, TaxSubjectProfile};

use crate::commands::EngineContext;
use crate::input;

/// Arguments for liquidating one classified invoice
#[derive(Args)]
pub struct LiquidateArgs {
    /// Path to JSON or YAML invoice file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for evaluating a single concept against one subject
#[derive(Args)]
pub struct EvaluateArgs {
    /// Concept identifier (e.g. servicios_generales)
    #[arg(long)]
    pub concept: String,
    /// Taxable base in pesos
    #[arg(long)]
    pub base: Decimal,
    /// natural_person, legal_entity, large_taxpayer, special_regime, simple_regime
    #[arg(long)]
    pub subject_type: SubjectType,
    /// NIT or cédula of the payee
    #[arg(long, default_value = "unspecified")]
    pub tax_id: String,
}

/// Arguments for consortium share normalization
#[derive(Args)]
pub struct NormalizeSharesArgs {
    /// Declared shares in percent, comma separated (e.g. 33.33,33.33,33.34)
    #[arg(long, value_delimiter = ',', required = true)]
    pub shares: Vec<Decimal>,
    /// Allowed deviation of the declared sum from 100
    #[arg(long)]
    pub tolerance: Option<Decimal>,
}

/// Arguments for liquidating a batch of invoices
#[derive(Args)]
pub struct BatchArgs {
    /// Path to JSON or YAML file with an `invoices` array
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_liquidate(
    args: LiquidateArgs,
    ctx: &EngineContext,
) -> Result<Value, Box<dyn std::error::Error>> {
    let invoice: ClassifiedInvoice = input::read_input(args.input.as_deref(), "liquidation")?;
    let result = liquidation::liquidate_invoice(&ctx.catalog, &ctx.config, &invoice)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_evaluate(
    args: EvaluateArgs,
    ctx: &EngineContext,
) -> Result<Value, Box<dyn std::error::Error>> {
    let eval_input = EvaluationInput {
        concept_id: args.concept,
        base: args.base,
        subject: TaxSubjectProfile::new(args.subject_type, args.tax_id),
    };
    let result = tariff::evaluate_concept(&ctx.catalog, &eval_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_normalize_shares(
    args: NormalizeSharesArgs,
    ctx: &EngineContext,
) -> Result<Value, Box<dyn std::error::Error>> {
    let share_input = ShareNormalizationInput {
        shares: args.shares,
        tolerance: Some(args.tolerance.unwrap_or(ctx.config.share_tolerance)),
    };
    let result = shares::normalize_declared_shares(&share_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_batch(args: BatchArgs, ctx: &EngineContext) -> Result<Value, Box<dyn std::error::Error>> {
    let batch_input: BatchInput = input::read_input(args.input.as_deref(), "batch liquidation")?;
    let result = batch::liquidate_batch(&ctx.catalog, &ctx.config, &batch_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_concepts(ctx: &EngineContext) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(ctx.catalog.concepts())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::fs;

    fn decimal_at(value: &Value, pointer: &str) -> Decimal {
        value
            .pointer(pointer)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| panic!("no decimal at {}", pointer))
    }

    fn default_ctx() -> EngineContext {
        EngineContext::load(None, None).unwrap()
    }

    #[test]
    fn test_evaluate_with_builtin_catalog() {
        let args = EvaluateArgs {
            concept: "servicios_generales".to_string(),
            base: dec!(1_000_000),
            subject_type: SubjectType::LegalEntity,
            tax_id: "900123456".to_string(),
        };
        let value = run_evaluate(args, &default_ctx()).unwrap();

        assert_eq!(decimal_at(&value, "/result/withholding_amount"), dec!(40_000));
        assert_eq!(value["result"]["applicable"], true);
    }

    #[test]
    fn test_normalize_shares_uses_configured_tolerance() {
        let args = NormalizeSharesArgs {
            shares: vec![dec!(33.33), dec!(33.33), dec!(33.33)],
            tolerance: None,
        };
        let value = run_normalize_shares(args, &default_ctx()).unwrap();

        assert_eq!(decimal_at(&value, "/result/shares/0"), dec!(33.34));
        assert_eq!(decimal_at(&value, "/result/shares/2"), dec!(33.33));
    }

    #[test]
    fn test_yaml_catalog_and_json_invoice() {
        let dir = std::env::temp_dir().join(format!("rete-cli-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let catalog_path = dir.join("catalog.yaml");
        fs::write(
            &catalog_path,
            "concepts:\n  - concept_id: consultoria\n    rate: \"0.035\"\n    minimum_base: \"2000000\"\n    applicable_subject_types: [persona_juridica, gran_contribuyente]\n",
        )
        .unwrap();

        let invoice_path = dir.join("invoice.json");
        fs::write(
            &invoice_path,
            r#"{
                "invoice_id": "FE-77",
                "concept_id": "consultoria",
                "total_base": "9000000",
                "is_consortium": true,
                "participants": [
                    {"name": "A", "subject_type": "legal_entity", "tax_id": "1", "declared_share_pct": "33.33"},
                    {"name": "B", "subject_type": "legal_entity", "tax_id": "2", "declared_share_pct": "33.33"},
                    {"name": "C", "subject_type": "large_taxpayer", "tax_id": "3", "declared_share_pct": "33.34"}
                ]
            }"#,
        )
        .unwrap();

        let ctx = EngineContext::load(catalog_path.to_str(), None).unwrap();
        assert_eq!(ctx.catalog.len(), 1);

        let args = LiquidateArgs {
            input: invoice_path.to_str().map(str::to_string),
        };
        let value = run_liquidate(args, &ctx).unwrap();
        assert_eq!(decimal_at(&value, "/result/total_withholding"), dec!(315_000));
        assert_eq!(decimal_at(&value, "/result/lines/2/allocated_base"), dec!(3_000_600));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_catalog_file_is_an_error() {
        assert!(EngineContext::load(Some("/nonexistent/catalog.yaml"), None).is_err());
    }
}
