//! Writes a granule out in one of the supported formats.

use crate::config::{AnalysisConfig, DEFAULT_GEOJSON_DIR, ExportFormat, TimeDecoding};
use crate::error::{AerosolError, Result};
use crate::geojson::{output_filename, CollectionMetadata, FeatureCollection};
use crate::grid::GridDataset;
use crate::io::netcdf::{open_dataset, write_dataset};
use crate::io::table::FlatTable;
use crate::io::{csv, parquet, summary};
use crate::points::extract_points;
use crate::resolve::{resolve_coordinates, resolve_variable};
use crate::validate::{filter_to_bbox, validate_in_bbox, BoxStatus};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub input: PathBuf,
    pub format: ExportFormat,
    pub output: Option<PathBuf>,
    /// Only used by `variable-csv`.
    pub variable: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Written { path: PathBuf, records: usize },
    /// Nothing left in the box; no file was written.
    NoData { status: BoxStatus },
}

fn stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Output path used when none is given, next to the input file.
pub fn default_output(input: &Path, format: ExportFormat, variable: Option<&str>) -> PathBuf {
    let s = stem(input);
    let name = match format {
        ExportFormat::Csv => format!("{}.csv", s),
        ExportFormat::Parquet => format!("{}.parquet", s),
        ExportFormat::VariableCsv => format!("{}_{}.csv", s, variable.unwrap_or("variable")),
        ExportFormat::Info => format!("{}_info.txt", s),
        ExportFormat::SubsetCsv => format!("{}_bbox.csv", s),
        ExportFormat::SubsetNetcdf => format!("{}_bbox.nc", s),
        ExportFormat::Geojson => {
            return Path::new(DEFAULT_GEOJSON_DIR).join(output_filename(input));
        }
    };
    input.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn subset(dataset: &GridDataset, config: &AnalysisConfig) -> Result<GridDataset> {
    let coords = resolve_coordinates(dataset, &config.lat_aliases, &config.lon_aliases)?;
    println!("Filtering data to {}...", config.bbox);
    filter_to_bbox(dataset, &coords, &config.bbox)
}

/// Box-filtered point features of the resolved AOD variable as GeoJSON.
pub fn export_geojson(
    dataset: &GridDataset,
    source: &Path,
    output: &Path,
    config: &AnalysisConfig,
) -> Result<ExportOutcome> {
    let variable = resolve_variable(dataset, &config.variable_candidates)?;
    println!("Using AOD variable: {}", variable);
    let coords = resolve_coordinates(dataset, &config.lat_aliases, &config.lon_aliases)?;
    println!("Using coordinates: {}, {}", coords.lat, coords.lon);

    println!("Filtering data to {}...", config.bbox);
    let validation = validate_in_bbox(dataset, &variable, &coords, &config.bbox)?;
    if !validation.is_valid {
        println!("Warning: {}", validation.status.reason());
        return Ok(ExportOutcome::NoData {
            status: validation.status,
        });
    }

    let metadata = CollectionMetadata::from_dataset(dataset, &variable, source);
    let points = extract_points(&validation.filtered_view, &variable, &coords)?;
    let collection = FeatureCollection::from_points(metadata, points);

    ensure_parent(output)?;
    let writer = BufWriter::new(File::create(output)?);
    serde_json::to_writer_pretty(writer, &collection)?;

    Ok(ExportOutcome::Written {
        path: output.to_path_buf(),
        records: collection.features.len(),
    })
}

/// Runs one export against an already opened dataset.
pub fn export_dataset(
    dataset: &GridDataset,
    request: &ExportRequest,
    config: &AnalysisConfig,
) -> Result<ExportOutcome> {
    let output = request.output.clone().unwrap_or_else(|| {
        default_output(&request.input, request.format, request.variable.as_deref())
    });
    info!(format = ?request.format, output = %output.display(), "exporting");

    ensure_parent(&output)?;
    let records = match request.format {
        ExportFormat::Geojson => {
            return export_geojson(dataset, &request.input, &output, config);
        }
        ExportFormat::Csv => csv::write_table(&output, &FlatTable::from_dataset(dataset)?)?,
        ExportFormat::Parquet => {
            parquet::write_table(&output, &FlatTable::from_dataset(dataset)?)?
        }
        ExportFormat::VariableCsv => {
            let name = request
                .variable
                .clone()
                .ok_or_else(|| AerosolError::VariableNotFound {
                    candidates: Vec::new(),
                    available: dataset.variable_names(),
                })?;
            csv::write_table(&output, &FlatTable::from_variables(dataset, &[name])?)?
        }
        ExportFormat::Info => {
            let text = summary::render(dataset);
            fs::write(&output, &text)?;
            text.lines().count()
        }
        ExportFormat::SubsetCsv => {
            let view = subset(dataset, config)?;
            csv::write_table(&output, &FlatTable::from_dataset(&view)?)?
        }
        ExportFormat::SubsetNetcdf => {
            let view = subset(dataset, config)?;
            write_dataset(&output, &view)?;
            view.variables.values().map(|v| v.size()).sum()
        }
    };

    Ok(ExportOutcome::Written {
        path: output,
        records,
    })
}

/// Opens `request.input` and exports it. GeoJSON reads time raw, the
/// tabular formats decode it.
pub fn run_export(request: &ExportRequest, config: &AnalysisConfig) -> Result<ExportOutcome> {
    let decoding = match request.format {
        ExportFormat::Geojson => TimeDecoding::Raw,
        _ => TimeDecoding::Strict,
    };
    let dataset = open_dataset(&request.input, decoding)?;
    export_dataset(&dataset, request, config)
}
