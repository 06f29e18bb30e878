use std::sync::{Arc, OnceLock};

use super::boundary::{load_boundaries, BoundarySet};
use super::error::Result;
use super::loader::load_table;
use super::model::EmissionTable;
use crate::config::AtlasConfig;

// ---------------------------------------------------------------------------
// AtlasContext – loaded-once inputs shared by every recomputation
// ---------------------------------------------------------------------------

/// Built once at startup and handed to the UI. Each input is read from
/// storage on first access and the same `Arc` is returned afterwards.
/// A failed load is not cached.
#[derive(Debug, Default)]
pub struct AtlasContext {
    config: AtlasConfig,
    table: OnceLock<Arc<EmissionTable>>,
    boundaries: OnceLock<Arc<BoundarySet>>,
}

impl AtlasContext {
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            config,
            table: OnceLock::new(),
            boundaries: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// The emissions table, loading it on first call.
    pub fn table(&self) -> Result<Arc<EmissionTable>> {
        if let Some(table) = self.table.get() {
            log::debug!("Emission table served from cache");
            return Ok(Arc::clone(table));
        }
        let loaded = Arc::new(load_table(&self.config.data_path)?);
        Ok(Arc::clone(self.table.get_or_init(|| loaded)))
    }

    /// The boundary collection and its code → name lookup, loading on first call.
    pub fn boundaries(&self) -> Result<Arc<BoundarySet>> {
        if let Some(set) = self.boundaries.get() {
            log::debug!("Boundaries served from cache");
            return Ok(Arc::clone(set));
        }
        let loaded = Arc::new(load_boundaries(
            &self.config.boundary_path,
            &self.config.boundary_keys,
        )?);
        Ok(Arc::clone(self.boundaries.get_or_init(|| loaded)))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::error::AtlasError;

    fn write_inputs(dir: &Path) -> AtlasConfig {
        let config = AtlasConfig {
            data_path: dir.join("emissions.csv"),
            boundary_path: dir.join("communes.geojson"),
            ..AtlasConfig::default()
        };
        std::fs::write(
            &config.data_path,
            "ano,region,comuna,id_comuna,tipo_fuente,contaminantes,cantidad_toneladas\n\
             2020,A,X,1,wood,PM,10\n",
        )
        .unwrap();
        std::fs::write(
            &config.boundary_path,
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"cod_comuna":1,"Comuna":"X"},"geometry":null}]}"#,
        )
        .unwrap();
        config
    }

    #[test]
    fn repeated_calls_reuse_the_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path());
        let context = AtlasContext::new(config.clone());

        let first = context.table().unwrap();
        let first_boundaries = context.boundaries().unwrap();
        // Storage is not consulted again.
        std::fs::remove_file(&config.data_path).unwrap();
        std::fs::remove_file(&config.boundary_path).unwrap();

        assert!(Arc::ptr_eq(&first, &context.table().unwrap()));
        assert!(Arc::ptr_eq(
            &first_boundaries,
            &context.boundaries().unwrap()
        ));
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn missing_inputs_surface_their_error() {
        let dir = tempfile::tempdir().unwrap();
        let context = AtlasContext::new(AtlasConfig {
            data_path: dir.path().join("missing.parquet"),
            boundary_path: dir.path().join("missing.geojson"),
            ..AtlasConfig::default()
        });
        assert!(matches!(
            context.table().unwrap_err(),
            AtlasError::DataUnavailable { .. }
        ));
        assert!(matches!(
            context.boundaries().unwrap_err(),
            AtlasError::BoundaryUnavailable { .. }
        ));
    }
}
