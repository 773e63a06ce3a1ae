//! Batch check of a directory of NetCDF granules for usable data in the box.

use crate::config::{AnalysisConfig, TimeDecoding};
use crate::error::AerosolError;
use crate::grid::GridDataset;
use crate::io::netcdf::open_dataset;
use crate::resolve::{resolve_coordinates, resolve_variable};
use crate::validate::{validate_in_bbox, BoxStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Result of checking one file. Everything except `Valid` counts as invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum FileCheck {
    Valid { variable: String, count: usize },
    MissingVariable { candidates: Vec<String> },
    MissingCoordinates { available: Vec<String> },
    EmptyIntersection { variable: String },
    AllMasked { variable: String },
    ReadFailure { message: String },
}

impl FileCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, FileCheck::Valid { .. })
    }

    pub fn category(&self) -> &'static str {
        match self {
            FileCheck::Valid { .. } => "valid",
            FileCheck::MissingVariable { .. } => "missing variable",
            FileCheck::MissingCoordinates { .. } => "missing coordinates",
            FileCheck::EmptyIntersection { .. } => "no data in box",
            FileCheck::AllMasked { .. } => "all values masked",
            FileCheck::ReadFailure { .. } => "read failure",
        }
    }
}

impl fmt::Display for FileCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCheck::Valid { variable, count } => write!(
                f,
                "SUCCESS: Found {} non-NaN points in bounding box (Variable: {})",
                count, variable
            ),
            FileCheck::MissingVariable { candidates } => write!(
                f,
                "FAIL: Missing required AOD variable. Checked for: {:?}",
                candidates
            ),
            FileCheck::MissingCoordinates { available } => write!(
                f,
                "FAIL: Could not find latitude/longitude coordinates. Available coords: {:?}",
                available
            ),
            FileCheck::EmptyIntersection { variable } => write!(
                f,
                "FAIL: Variable {} has no data in the bounding box",
                variable
            ),
            FileCheck::AllMasked { variable } => write!(
                f,
                "FAIL: Variable {} in bounding box is all NaN ({})",
                variable,
                BoxStatus::AllMasked.reason()
            ),
            FileCheck::ReadFailure { message } => write!(f, "Warning: Error reading file: {}", message),
        }
    }
}

/// Runs resolution and validation on an already opened dataset.
pub fn assess_dataset(dataset: &GridDataset, config: &AnalysisConfig) -> FileCheck {
    let variable = match resolve_variable(dataset, &config.variable_candidates) {
        Ok(v) => v,
        Err(_) => {
            return FileCheck::MissingVariable {
                candidates: config.variable_candidates.clone(),
            };
        }
    };

    let coords = match resolve_coordinates(dataset, &config.lat_aliases, &config.lon_aliases) {
        Ok(c) => c,
        Err(_) => {
            return FileCheck::MissingCoordinates {
                available: dataset.coord_names(),
            };
        }
    };

    match validate_in_bbox(dataset, &variable, &coords, &config.bbox) {
        Ok(v) => match v.status {
            BoxStatus::Valid => FileCheck::Valid {
                variable,
                count: v.valid_point_count,
            },
            BoxStatus::EmptyIntersection => FileCheck::EmptyIntersection { variable },
            BoxStatus::AllMasked => FileCheck::AllMasked { variable },
        },
        Err(e) => FileCheck::ReadFailure {
            message: e.to_string(),
        },
    }
}

/// Opens and checks one file. Read errors are folded into the result so a
/// batch can keep going.
pub fn check_file(path: &Path, config: &AnalysisConfig) -> FileCheck {
    match open_dataset(path, TimeDecoding::Raw) {
        Ok(dataset) => assess_dataset(&dataset, config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not open dataset");
            FileCheck::ReadFailure {
                message: match e {
                    AerosolError::SourceRead { source, .. } => source.to_string(),
                    other => other.to_string(),
                },
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub results: Vec<(PathBuf, FileCheck)>,
}

impl ScanSummary {
    pub fn valid_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_valid())
            .map(|(p, _)| p)
    }

    pub fn valid_count(&self) -> usize {
        self.valid_files().count()
    }

    pub fn invalid_count(&self) -> usize {
        self.results.len() - self.valid_count()
    }

    /// Invalid file counts per reason, in first-seen order.
    pub fn tally(&self) -> Vec<(&'static str, usize)> {
        let mut tally: Vec<(&'static str, usize)> = Vec::new();
        for (_, r) in self.results.iter().filter(|(_, r)| !r.is_valid()) {
            match tally.iter_mut().find(|(c, _)| *c == r.category()) {
                Some((_, n)) => *n += 1,
                None => tally.push((r.category(), 1)),
            }
        }
        tally
    }

    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

fn is_netcdf(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("nc") | Some("nc4")
    )
}

pub fn find_netcdf_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_netcdf(e.path()))
        .map(|e| e.into_path())
        .collect()
}

/// Checks every `.nc`/`.nc4` file under `dir`, one at a time. Returns `None`
/// when the directory does not exist.
pub fn scan_directory(dir: &Path, config: &AnalysisConfig) -> Option<ScanSummary> {
    if !dir.is_dir() {
        return None;
    }
    let files = find_netcdf_files(dir);
    debug!(dir = %dir.display(), files = files.len(), "scanning");

    let mut summary = ScanSummary {
        root: dir.to_path_buf(),
        results: Vec::with_capacity(files.len()),
    };

    let pb = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    for path in files {
        pb.println(format!("\nChecking file: {}", summary.display_path(&path)));
        let result = check_file(&path, config);
        pb.println(format!("   - {}", result));
        summary.results.push((path, result));
        pb.inc(1);
    }
    pb.finish_and_clear();

    Some(summary)
}

pub fn print_summary(summary: &ScanSummary) {
    println!("\n{}", "=".repeat(60));
    println!(
        "Scan Complete. Files with valid data: {}, without: {}",
        summary.valid_count(),
        summary.invalid_count()
    );
    for (category, n) in summary.tally() {
        println!("   - {}: {}", category, n);
    }
    println!("{}", "=".repeat(60));

    if summary.valid_count() > 0 {
        println!("List of Valid Data Files (clear view over the bounding box):");
        for path in summary.valid_files() {
            println!("- {}", summary.display_path(path));
        }
    } else {
        println!(
            "No NetCDF files were found with valid, non-cloud-masked data for the bounding box."
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Coordinate, Variable};
    use crate::validate::tests::seattle_grid;

    #[test]
    fn test_assess_valid() {
        let ds = seattle_grid(vec![0.15, f64::NAN, f64::NAN, f64::NAN]);
        assert_eq!(
            assess_dataset(&ds, &AnalysisConfig::seattle()),
            FileCheck::Valid {
                variable: "Aerosol_Optical_Depth_550".into(),
                count: 1
            }
        );
    }

    #[test]
    fn test_assess_missing_variable_lists_candidates() {
        let ds = GridDataset::new()
            .with_coord("lat", Coordinate::new("lat", vec![47.5]))
            .with_coord("lon", Coordinate::new("lon", vec![-122.3]))
            .with_variable(
                "chlor_a",
                Variable::new("chlor_a", vec!["lat".into(), "lon".into()], vec![1, 1], vec![1.0])
                    .unwrap(),
            );
        let config = AnalysisConfig::seattle();
        match assess_dataset(&ds, &config) {
            FileCheck::MissingVariable { candidates } => {
                assert_eq!(candidates, config.variable_candidates)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_assess_missing_coordinates() {
        let ds = seattle_grid(vec![0.1; 4]);
        let mut config = AnalysisConfig::seattle();
        config.lat_aliases = vec!["y".into()];
        assert!(matches!(
            assess_dataset(&ds, &config),
            FileCheck::MissingCoordinates { .. }
        ));
    }

    #[test]
    fn test_assess_all_masked_message_has_hint() {
        let ds = seattle_grid(vec![f64::NAN; 4]);
        let result = assess_dataset(&ds, &AnalysisConfig::seattle());
        assert!(result.to_string().contains("cloud"));
    }

    #[test]
    fn test_tally() {
        let summary = ScanSummary {
            root: PathBuf::from("/data"),
            results: vec![
                (PathBuf::from("/data/a.nc"), FileCheck::Valid { variable: "v".into(), count: 3 }),
                (PathBuf::from("/data/b.nc"), FileCheck::AllMasked { variable: "v".into() }),
                (PathBuf::from("/data/c.nc"), FileCheck::ReadFailure { message: "x".into() }),
                (PathBuf::from("/data/d.nc"), FileCheck::AllMasked { variable: "v".into() }),
            ],
        };
        assert_eq!(summary.valid_count(), 1);
        assert_eq!(summary.invalid_count(), 3);
        assert_eq!(
            summary.tally(),
            vec![("all values masked", 2), ("read failure", 1)]
        );
        assert_eq!(summary.display_path(Path::new("/data/sub/a.nc")), "sub/a.nc");
    }

    #[test]
    fn test_missing_directory() {
        assert!(scan_directory(Path::new("/definitely/not/here"), &AnalysisConfig::seattle()).is_none());
    }
}
