use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RetencionError;
use crate::types::{Money, Percentage};
use crate::RetencionResult;

/// UVT (Unidad de Valor Tributario) for tax year 2025, in pesos.
pub const DEFAULT_UVT_VALUE: Money = dec!(49799);

/// Allowed deviation of declared consortium shares from 100%.
pub const DEFAULT_SHARE_TOLERANCE: Percentage = dec!(0.5);

/// Engine-wide settings, passed explicitly into every entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Peso value of one UVT, used to resolve UVT-denominated minimum bases.
    pub uvt_value: Money,
    pub share_tolerance: Percentage,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            uvt_value: DEFAULT_UVT_VALUE,
            share_tolerance: DEFAULT_SHARE_TOLERANCE,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> RetencionResult<()> {
        if self.uvt_value <= dec!(0) {
            return Err(RetencionError::invalid_input(
                "uvt_value",
                "UVT value must be positive",
            ));
        }
        if self.share_tolerance < dec!(0) {
            return Err(RetencionError::invalid_input(
                "share_tolerance",
                "Share tolerance cannot be negative",
            ));
        }
        Ok(())
    }
}
