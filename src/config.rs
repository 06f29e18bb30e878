use std::path::PathBuf;

use crate::data::boundary::BoundaryKeys;

/// Fixed startup configuration. The dashboard takes no flags; the data
/// files are expected next to the working directory.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasConfig {
    pub data_path: PathBuf,
    pub boundary_path: PathBuf,
    pub boundary_keys: BoundaryKeys,
    /// How many communes the ranking chart shows.
    pub top_communes: usize,
    pub source: DataSource,
}

/// Attribution for the emissions data, linked from the top bar.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub label: String,
    pub url: String,
}

impl Default for DataSource {
    fn default() -> Self {
        Self {
            label: "Registro de Emisiones y Transferencia de Contaminantes (RETC)".to_string(),
            url: "https://datosretc.mma.gob.cl/dataset/emisiones-al-aire".to_string(),
        }
    }
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data").join("emisiones_consolidadas_limpias.parquet"),
            boundary_path: PathBuf::from("data").join("comunas.geojson"),
            boundary_keys: BoundaryKeys::default(),
            top_communes: 15,
            source: DataSource::default(),
        }
    }
}
