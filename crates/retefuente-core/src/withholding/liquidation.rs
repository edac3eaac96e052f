use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::RetencionError;
use crate::types::*;
use crate::withholding::catalog::ConceptCatalog;
use crate::withholding::consortium::{allocate, Participant};
use crate::withholding::tariff::{evaluate, LiquidationLine};
use crate::RetencionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Invoice as handed over by the upstream document classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedInvoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    pub concept_id: String,
    pub total_base: Money,
    #[serde(default)]
    pub is_consortium: bool,
    /// Present iff the invoice is not a consortium invoice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<TaxSubjectProfile>,
    /// Present and non-empty iff the invoice is a consortium invoice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<Participant>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationSummary {
    pub line_count: usize,
    pub applicable_lines: usize,
    /// total_withholding / total_base, 6 dp.
    pub effective_rate: Rate,
    pub net_payable: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationResult {
    pub concept_id: String,
    pub is_consortium: bool,
    pub lines: Vec<LiquidationLine>,
    pub total_base: Money,
    pub total_withholding: Money,
    pub summary: LiquidationSummary,
}

impl ClassifiedInvoice {
    pub fn single(
        concept_id: impl Into<String>,
        total_base: Money,
        subject: TaxSubjectProfile,
    ) -> Self {
        Self {
            invoice_id: None,
            concept_id: concept_id.into(),
            total_base,
            is_consortium: false,
            subject: Some(subject),
            participants: None,
        }
    }

    pub fn consortium(
        concept_id: impl Into<String>,
        total_base: Money,
        participants: Vec<Participant>,
    ) -> Self {
        Self {
            invoice_id: None,
            concept_id: concept_id.into(),
            total_base,
            is_consortium: true,
            subject: None,
            participants: Some(participants),
        }
    }

    pub fn with_invoice_id(mut self, invoice_id: impl Into<String>) -> Self {
        self.invoice_id = Some(invoice_id.into());
        self
    }
}

impl LiquidationResult {
    /// Assemble a result; totals are derived from the lines.
    pub fn from_lines(
        concept_id: &str,
        is_consortium: bool,
        total_base: Money,
        lines: Vec<LiquidationLine>,
    ) -> Self {
        let total_withholding: Money = lines.iter().map(|l| l.withholding_amount).sum();
        let effective_rate = if total_base > dec!(0) {
            (total_withholding / total_base).round_dp(6)
        } else {
            dec!(0)
        };
        let summary = LiquidationSummary {
            line_count: lines.len(),
            applicable_lines: lines.iter().filter(|l| l.applicable).count(),
            effective_rate,
            net_payable: total_base - total_withholding,
        };
        Self {
            concept_id: concept_id.to_string(),
            is_consortium,
            lines,
            total_base,
            total_withholding,
            summary,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Liquidate one classified invoice.
///
/// Single-issuer invoices go straight to the tariff evaluator; consortium
/// invoices go through the allocator. An inconsistent consortium flag is a
/// `MalformedInvoice` error, never a guess.
pub fn liquidate(
    catalog: &ConceptCatalog,
    config: &EngineConfig,
    invoice: &ClassifiedInvoice,
) -> RetencionResult<LiquidationResult> {
    if invoice.total_base < dec!(0) {
        return Err(RetencionError::invalid_input(
            "total_base",
            "Taxable base cannot be negative",
        ));
    }

    let result = if invoice.is_consortium {
        if invoice.subject.is_some() {
            return Err(RetencionError::MalformedInvoice(
                "consortium invoice carries a single-issuer subject".to_string(),
            ));
        }
        let participants = invoice
            .participants
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                RetencionError::MalformedInvoice(
                    "consortium invoice has no participants".to_string(),
                )
            })?;
        allocate(
            catalog,
            config,
            &invoice.concept_id,
            invoice.total_base,
            participants,
        )?
    } else {
        if invoice.participants.is_some() {
            return Err(RetencionError::MalformedInvoice(
                "participants present on an invoice not flagged as consortium".to_string(),
            ));
        }
        let subject = invoice.subject.as_ref().ok_or_else(|| {
            RetencionError::MalformedInvoice("single-issuer invoice has no subject".to_string())
        })?;
        let line = evaluate(catalog, &invoice.concept_id, invoice.total_base, subject)?;
        LiquidationResult::from_lines(&invoice.concept_id, false, invoice.total_base, vec![line])
    };

    tracing::info!(
        invoice = invoice.invoice_id.as_deref().unwrap_or("-"),
        concept = %result.concept_id,
        consortium = result.is_consortium,
        lines = result.lines.len(),
        total_base = %result.total_base,
        total_withholding = %result.total_withholding,
        "Invoice liquidated"
    );

    Ok(result)
}

/// Liquidate one invoice and wrap the result in the standard output envelope.
pub fn liquidate_invoice(
    catalog: &ConceptCatalog,
    config: &EngineConfig,
    invoice: &ClassifiedInvoice,
) -> RetencionResult<ComputationOutput<LiquidationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = liquidate(catalog, config, invoice)?;

    if let Some(participants) = &invoice.participants {
        let declared: Percentage = participants.iter().map(|p| p.declared_share_pct).sum();
        if result.is_consortium && declared != dec!(100) {
            warnings.push(format!(
                "Declared participant shares sum to {}%; shares were rescaled to 100%.",
                declared
            ));
        }
    }
    for line in result.lines.iter().filter(|l| !l.applicable) {
        warnings.push(format!(
            "{}: base {} is under the {} minimum; no withholding applies.",
            line.subject_tax_id, line.allocated_base, line.rule_applied
        ));
    }

    let methodology = if result.is_consortium {
        "Consortium liquidation: normalized shares, prorated base with cent reconciliation, \
         per-participant tariff evaluation"
    } else {
        "Single-issuer liquidation: catalog rate applied to base at or above the minimum"
    };

    let assumptions = serde_json::json!({
        "invoice_id": invoice.invoice_id,
        "concept_id": invoice.concept_id,
        "total_base": invoice.total_base.to_string(),
        "is_consortium": invoice.is_consortium,
        "uvt_value": config.uvt_value.to_string(),
        "share_tolerance": config.share_tolerance.to_string(),
        "rounding": "half-up to 2 decimal places",
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, &assumptions, warnings, elapsed, result))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
