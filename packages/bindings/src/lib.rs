use napi::Result as NapiResult;
use napi_derive::napi;

use retefuente_core::withholding::{
    batch, liquidation, shares, tariff, CatalogDefinition, ConceptCatalog,
};
use retefuente_core::EngineConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Build the engine from optional catalog/config JSON documents, falling back
/// to the built-in catalog and default configuration.
fn engine(
    catalog_json: Option<String>,
    config_json: Option<String>,
) -> NapiResult<(ConceptCatalog, EngineConfig)> {
    let config: EngineConfig = match config_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => EngineConfig::default(),
    };
    let catalog = match catalog_json {
        Some(json) => {
            let definition: CatalogDefinition =
                serde_json::from_str(&json).map_err(to_napi_error)?;
            ConceptCatalog::from_definition(&definition, &config).map_err(to_napi_error)?
        }
        None => ConceptCatalog::colombian_default(&config).map_err(to_napi_error)?,
    };
    Ok((catalog, config))
}

// ---------------------------------------------------------------------------
// Liquidation
// ---------------------------------------------------------------------------

#[napi]
pub fn liquidate_invoice(
    input_json: String,
    catalog_json: Option<String>,
    config_json: Option<String>,
) -> NapiResult<String> {
    let (catalog, config) = engine(catalog_json, config_json)?;
    let input: liquidation::ClassifiedInvoice =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        liquidation::liquidate_invoice(&catalog, &config, &input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn liquidate_batch(
    input_json: String,
    catalog_json: Option<String>,
    config_json: Option<String>,
) -> NapiResult<String> {
    let (catalog, config) = engine(catalog_json, config_json)?;
    let input: batch::BatchInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = batch::liquidate_batch(&catalog, &config, &input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

#[napi]
pub fn evaluate_concept(
    input_json: String,
    catalog_json: Option<String>,
    config_json: Option<String>,
) -> NapiResult<String> {
    let (catalog, _) = engine(catalog_json, config_json)?;
    let input: tariff::EvaluationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = tariff::evaluate_concept(&catalog, &input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn normalize_shares(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config: EngineConfig = match config_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => EngineConfig::default(),
    };
    config.validate().map_err(to_napi_error)?;
    let mut input: shares::ShareNormalizationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    input.tolerance.get_or_insert(config.share_tolerance);
    let output = shares::normalize_declared_shares(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn list_concepts(
    catalog_json: Option<String>,
    config_json: Option<String>,
) -> NapiResult<String> {
    let (catalog, _) = engine(catalog_json, config_json)?;
    serde_json::to_string(&catalog.concepts()).map_err(to_napi_error)
}
