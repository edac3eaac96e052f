pub mod catalog;
pub mod consortium;
pub mod liquidation;
pub mod shares;
pub mod tariff;

#[cfg(feature = "batch")]
pub mod batch;

pub use catalog::{CatalogDefinition, ConceptCatalog, ConceptDefinition, ConceptRule};
pub use consortium::{allocate, Participant};
pub use liquidation::{
    liquidate, liquidate_invoice, ClassifiedInvoice, LiquidationResult, LiquidationSummary,
};
pub use shares::{normalize_declared_shares, normalize_shares, NormalizedShares};
pub use tariff::{evaluate, evaluate_concept, EvaluationInput, LiquidationLine};

#[cfg(feature = "batch")]
pub use batch::{liquidate_batch, BatchInput, BatchOutput};
