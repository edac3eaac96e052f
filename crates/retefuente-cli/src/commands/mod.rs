pub mod withholding;

use retefuente_core::withholding::{CatalogDefinition, ConceptCatalog};
use retefuente_core::EngineConfig;

use crate::input;

/// Catalog and configuration shared by every liquidation command.
pub struct EngineContext {
    pub catalog: ConceptCatalog,
    pub config: EngineConfig,
}

impl EngineContext {
    /// Load configuration first, since UVT-denominated minimums in the
    /// catalog are resolved against it.
    pub fn load(
        catalog_path: Option<&str>,
        config_path: Option<&str>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config: EngineConfig = match config_path {
            Some(path) => input::file::read_document(path)?,
            None => EngineConfig::default(),
        };
        config.validate()?;

        let catalog = match catalog_path {
            Some(path) => {
                let definition: CatalogDefinition = input::file::read_document(path)?;
                ConceptCatalog::from_definition(&definition, &config)?
            }
            None => ConceptCatalog::colombian_default(&config)?,
        };

        tracing::debug!(
            concepts = catalog.len(),
            uvt_value = %config.uvt_value,
            custom_catalog = catalog_path.is_some(),
            "Engine context loaded"
        );

        Ok(Self { catalog, config })
    }
}
