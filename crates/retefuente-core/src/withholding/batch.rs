use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::{ErrorKind, RetencionError};
use crate::types::*;
use crate::withholding::catalog::ConceptCatalog;
use crate::withholding::liquidation::{liquidate, ClassifiedInvoice, LiquidationResult};
use crate::RetencionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInput {
    pub invoices: Vec<ClassifiedInvoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Liquidated(LiquidationResult),
    Failed(BatchFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    pub results: Vec<BatchItem>,
    /// Totals cover liquidated invoices only.
    pub total_base: Money,
    pub total_withholding: Money,
    pub succeeded: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Batch liquidation
// ---------------------------------------------------------------------------

/// Liquidate many invoices independently. A failing invoice is reported in
/// its slot and does not stop the rest.
pub fn liquidate_batch(
    catalog: &ConceptCatalog,
    config: &EngineConfig,
    input: &BatchInput,
) -> RetencionResult<ComputationOutput<BatchOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.invoices.is_empty() {
        return Err(RetencionError::invalid_input(
            "invoices",
            "Batch must contain at least one invoice",
        ));
    }

    let mut results: Vec<BatchItem> = Vec::with_capacity(input.invoices.len());
    let mut total_base = dec!(0);
    let mut total_withholding = dec!(0);
    let mut succeeded = 0;
    let mut failed = 0;

    for (i, invoice) in input.invoices.iter().enumerate() {
        let outcome = match liquidate(catalog, config, invoice) {
            Ok(result) => {
                total_base = total_base.checked_add(result.total_base).ok_or_else(|| {
                    RetencionError::invalid_input("invoices", "Batch total base is out of range")
                })?;
                total_withholding = total_withholding
                    .checked_add(result.total_withholding)
                    .ok_or_else(|| {
                        RetencionError::invalid_input(
                            "invoices",
                            "Batch total withholding is out of range",
                        )
                    })?;
                succeeded += 1;
                BatchOutcome::Liquidated(result)
            }
            Err(e) => {
                failed += 1;
                warnings.push(format!("Invoice {}: {}", i + 1, e));
                tracing::warn!(
                    index = i,
                    invoice = invoice.invoice_id.as_deref().unwrap_or("-"),
                    kind = ?e.kind(),
                    error = %e,
                    "Invoice liquidation failed"
                );
                BatchOutcome::Failed(BatchFailure {
                    kind: e.kind(),
                    message: e.to_string(),
                })
            }
        };
        results.push(BatchItem {
            index: i,
            invoice_id: invoice.invoice_id.clone(),
            outcome,
        });
    }

    tracing::info!(
        invoices = input.invoices.len(),
        succeeded,
        failed,
        total_withholding = %total_withholding,
        "Batch liquidated"
    );

    let result = BatchOutput {
        results,
        total_base,
        total_withholding,
        succeeded,
        failed,
    };

    let assumptions = serde_json::json!({
        "num_invoices": input.invoices.len(),
        "uvt_value": config.uvt_value.to_string(),
        "share_tolerance": config.share_tolerance.to_string(),
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Independent per-invoice withholding liquidation with batch totals",
        &assumptions,
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
