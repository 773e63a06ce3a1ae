//! Error types for dataset loading, resolution and export.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AerosolError>;

#[derive(Error, Debug)]
pub enum AerosolError {
    /// None of the latitude or longitude aliases matched a coordinate.
    #[error(
        "could not find latitude/longitude coordinates (tried lat {lat_tried:?}, lon {lon_tried:?}; available: {available:?})"
    )]
    CoordinatesNotFound {
        lat_tried: Vec<String>,
        lon_tried: Vec<String>,
        available: Vec<String>,
    },

    /// None of the candidate measurement variables is present.
    #[error("missing required variable, checked for: {candidates:?} (available: {available:?})")]
    VariableNotFound {
        candidates: Vec<String>,
        available: Vec<String>,
    },

    #[error("failed to read {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("cannot decode time axis '{coordinate}' with units '{units}'")]
    TimeDecode { coordinate: String, units: String },

    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("shape mismatch for '{name}': {detail}")]
    ShapeMismatch { name: String, detail: String },

    #[error("variable '{variable}' has no dimension '{dimension}'")]
    MissingDimension { variable: String, dimension: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),
}

impl AerosolError {
    /// True for the recoverable "name not found" family.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            AerosolError::CoordinatesNotFound { .. } | AerosolError::VariableNotFound { .. }
        )
    }
}
