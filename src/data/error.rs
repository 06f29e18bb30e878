//! Error types for the loading pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop the dashboard. Filtering and aggregation never fail,
/// so every variant comes from one of the two loaders.
#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Data file not found at {}", path.display())]
    DataUnavailable { path: PathBuf },

    #[error("Data file {} could not be read: {reason}", path.display())]
    DataCorrupt { path: PathBuf, reason: String },

    #[error("Boundary file not found at {}", path.display())]
    BoundaryUnavailable { path: PathBuf },

    #[error("Boundary file {} could not be read: {reason}", path.display())]
    BoundaryCorrupt { path: PathBuf, reason: String },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AtlasError>;
