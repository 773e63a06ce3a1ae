//! Aerosol optical depth tooling for NASA NetCDF granules: find data over a
//! bounding box, check it is usable, and export it.

pub mod cmr;
pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod geojson;
pub mod grid;
pub mod inspect;
pub mod io;
pub mod points;
pub mod resolve;
pub mod scan;
pub mod validate;

pub use config::{AnalysisConfig, BoundingBox};
pub use error::{AerosolError, Result};
