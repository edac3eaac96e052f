use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::DEFAULT_SHARE_TOLERANCE;
use crate::error::RetencionError;
use crate::types::*;
use crate::RetencionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedShares {
    /// Corrected shares, same order as declared, summing to exactly 100.
    pub shares: Vec<Percentage>,
    pub declared_sum: Percentage,
    /// Rounding residual absorbed by `residual_index` after rescaling.
    pub residual: Percentage,
    pub residual_index: usize,
    /// True when the declared shares did not already sum to 100.
    pub rescaled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareNormalizationInput {
    pub shares: Vec<Percentage>,
    #[serde(default)]
    pub tolerance: Option<Percentage>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Index of the largest value; the first occurrence wins ties.
pub(crate) fn largest_index(values: &[Decimal]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Correct declared consortium shares so they sum to exactly 100.
///
/// Shares are rescaled by `100 / sum` and rounded to 2 decimals; the leftover
/// rounding residual goes entirely to the largest declared share. A declared
/// sum further than `tolerance` from 100 is rejected rather than rescaled.
pub fn normalize_shares(
    shares: &[Percentage],
    tolerance: Percentage,
) -> RetencionResult<NormalizedShares> {
    if shares.is_empty() {
        return Err(RetencionError::invalid_input(
            "shares",
            "At least one share is required",
        ));
    }
    for (i, share) in shares.iter().enumerate() {
        if *share <= dec!(0) || *share > dec!(100) {
            return Err(RetencionError::invalid_input(
                format!("shares[{}]", i),
                format!("Share {} must lie in (0, 100]", share),
            ));
        }
    }

    let hundred = dec!(100);
    let declared_sum: Percentage = shares.iter().copied().sum();
    if (declared_sum - hundred).abs() > tolerance {
        return Err(RetencionError::InvalidShareSum {
            sum: declared_sum,
            tolerance,
        });
    }

    let mut fixed: Vec<Percentage> = shares
        .iter()
        .map(|s| round_currency(*s * hundred / declared_sum))
        .collect();

    let residual = hundred - fixed.iter().copied().sum::<Percentage>();
    let residual_index = largest_index(shares);
    fixed[residual_index] += residual;

    let rescaled = declared_sum != hundred;
    if rescaled {
        tracing::warn!(
            declared_sum = %declared_sum,
            residual = %residual,
            residual_index,
            "Declared shares rescaled to 100%"
        );
    } else if !residual.is_zero() {
        tracing::debug!(residual = %residual, residual_index, "Share rounding residual applied");
    }

    Ok(NormalizedShares {
        shares: fixed,
        declared_sum,
        residual,
        residual_index,
        rescaled,
    })
}

/// Normalize shares and wrap the result in the standard output envelope.
pub fn normalize_declared_shares(
    input: &ShareNormalizationInput,
) -> RetencionResult<ComputationOutput<NormalizedShares>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let tolerance = input.tolerance.unwrap_or(DEFAULT_SHARE_TOLERANCE);

    let result = normalize_shares(&input.shares, tolerance)?;
    if result.rescaled {
        warnings.push(format!(
            "Declared shares sum to {}%; rescaled to 100%.",
            result.declared_sum
        ));
    }

    let assumptions = serde_json::json!({
        "participants": input.shares.len(),
        "tolerance": tolerance.to_string(),
        "residual_policy": "largest declared share absorbs the rounding residual",
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Largest-remainder share normalization to 2 decimal places",
        &assumptions,
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
