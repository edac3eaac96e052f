use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::RetencionError;
use crate::types::*;
use crate::withholding::catalog::ConceptCatalog;
use crate::withholding::liquidation::LiquidationResult;
use crate::withholding::shares::{largest_index, normalize_shares};
use crate::withholding::tariff::{evaluate, LiquidationLine};
use crate::RetencionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A consortium member: its own tax profile plus the share it declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    #[serde(flatten)]
    pub profile: TaxSubjectProfile,
    /// As stated on the source document; may not be exact.
    pub declared_share_pct: Percentage,
}

impl Participant {
    pub fn new(
        name: impl Into<String>,
        profile: TaxSubjectProfile,
        declared_share_pct: Percentage,
    ) -> RetencionResult<Self> {
        if declared_share_pct <= dec!(0) || declared_share_pct > dec!(100) {
            return Err(RetencionError::invalid_input(
                "declared_share_pct",
                format!("Share {} must lie in (0, 100]", declared_share_pct),
            ));
        }
        Ok(Self {
            name: name.into(),
            profile,
            declared_share_pct,
        })
    }
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// Split a consortium invoice across its members and liquidate each one.
///
/// Shares are normalized first, then the base is prorated and rounded to
/// cents; the rounding drift goes to the member with the largest allocated
/// base so the allocated bases add up to `total_base` exactly. Each member is
/// then evaluated against the concept with its own profile, so minimums and
/// subject-type exclusions apply per member.
pub fn allocate(
    catalog: &ConceptCatalog,
    config: &EngineConfig,
    concept_id: &str,
    total_base: Money,
    participants: &[Participant],
) -> RetencionResult<LiquidationResult> {
    if participants.len() < 2 {
        return Err(RetencionError::InsufficientParticipants {
            count: participants.len(),
        });
    }
    if total_base < dec!(0) {
        return Err(RetencionError::invalid_input(
            "total_base",
            "Taxable base cannot be negative",
        ));
    }

    let declared: Vec<Percentage> = participants.iter().map(|p| p.declared_share_pct).collect();
    let normalized = normalize_shares(&declared, config.share_tolerance)?;

    let mut bases: Vec<Money> = normalized
        .shares
        .iter()
        .map(|share| round_currency(total_base * (*share / dec!(100))))
        .collect();
    let allocated = bases
        .iter()
        .try_fold(dec!(0), |acc: Money, b| acc.checked_add(*b))
        .ok_or_else(|| {
            RetencionError::invalid_input("total_base", "Taxable base is out of range")
        })?;
    let drift = total_base - allocated;
    if !drift.is_zero() {
        let idx = largest_index(&bases);
        bases[idx] += drift;
        tracing::debug!(drift = %drift, participant = idx, "Base allocation drift reconciled");
    }

    let mut lines: Vec<LiquidationLine> = Vec::with_capacity(participants.len());
    for (i, (participant, base)) in participants.iter().zip(bases).enumerate() {
        let mut line = evaluate(catalog, concept_id, base, &participant.profile).map_err(|e| {
            RetencionError::Participant {
                index: i,
                tax_id: participant.profile.tax_id.clone(),
                source: Box::new(e),
            }
        })?;

        if !line.applicable {
            tracing::warn!(
                participant = %participant.name,
                tax_id = %participant.profile.tax_id,
                base = %base,
                "Participant base under concept minimum; nothing withheld"
            );
        }

        line.subject_name = Some(participant.name.clone());
        line.share_pct = Some(normalized.shares[i]);
        lines.push(line);
    }

    Ok(LiquidationResult::from_lines(
        concept_id,
        true,
        total_base,
        lines,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
