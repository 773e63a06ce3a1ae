//! Human-readable inspection of a NetCDF granule.

use crate::grid::{nan_min_max, GridDataset};
use crate::io::summary::truncate;
use std::fmt;
use std::path::Path;

const MAX_VAR_ATTR_LEN: usize = 60;
const MAX_GLOBAL_ATTR_LEN: usize = 120;
const MAX_COORD_VALUES: usize = 10;
const MAX_DATA_VALUES: usize = 20;

pub const AEROSOL_KEYWORDS: &[&str] = &["aod", "aerosol", "optical", "depth", "aot"];

pub const KEY_ATTRIBUTES: &[&str] = &[
    "product_name",
    "time_coverage_start",
    "time_coverage_end",
    "geospatial_lat_max",
    "geospatial_lat_min",
    "geospatial_lon_max",
    "geospatial_lon_min",
    "processing_version",
    "day_night_flag",
];

/// Counts taken before anything else is done with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreCheck {
    pub variables: usize,
    pub coordinates: usize,
    pub dimensions: usize,
    /// Size of the first data variable.
    pub total_points: usize,
}

impl PreCheck {
    pub fn of(dataset: &GridDataset) -> Self {
        PreCheck {
            variables: dataset.variables.len(),
            coordinates: dataset.coords.len(),
            dimensions: dataset.dims().len(),
            total_points: dataset
                .variables
                .values()
                .next()
                .map(|v| v.size())
                .unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_points == 0
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PreCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- FILE VALIDATION CHECK ---")?;
        writeln!(
            f,
            "Variables: {}, Coordinates: {}, Dimensions: {}",
            self.variables, self.coordinates, self.dimensions
        )?;
        if self.is_empty() {
            writeln!(f, "WARNING: FILE APPEARS EMPTY OR CONTAINS NO DATA POINTS.")?;
            writeln!(f, "This often happens with Ocean Color (OC) products over land.")?;
            writeln!(f, "Recommendation: use Aerosol products for urban air quality.")
        } else {
            writeln!(
                f,
                "File contains {} data points (based on first variable).",
                self.total_points
            )
        }
    }
}

/// Data variables whose name contains one of [`AEROSOL_KEYWORDS`], any case.
pub fn find_aerosol_variables(dataset: &GridDataset) -> Vec<String> {
    dataset
        .variables
        .keys()
        .filter(|name| {
            let lower = name.to_lowercase();
            AEROSOL_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .cloned()
        .collect()
}

fn format_values(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    let rule = "=".repeat(80);
    writeln!(f, "\n{}\n{}\n{}", rule, title, rule)
}

struct Report<'a> {
    dataset: &'a GridDataset,
    path: &'a Path,
}

impl Report<'_> {
    fn coordinates(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section(f, "COORDINATES:")?;
        if self.dataset.coords.is_empty() {
            writeln!(f, "  No coordinates found")?;
        }
        for (name, coord) in &self.dataset.coords {
            writeln!(f, "\n  {}:", name)?;
            writeln!(f, "    Shape: ({},)", coord.len())?;
            if let Some(labels) = &coord.labels {
                if labels.len() <= MAX_COORD_VALUES {
                    writeln!(f, "    Values: {:?}", labels)?;
                    continue;
                }
            }
            if coord.is_empty() {
                continue;
            }
            if coord.len() <= MAX_COORD_VALUES {
                writeln!(f, "    Values: {}", format_values(&coord.values))?;
            } else if let Some((lo, hi)) = nan_min_max(&coord.values) {
                writeln!(f, "    Range: {} to {}", lo, hi)?;
            }
        }
        Ok(())
    }

    fn variables(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section(f, "DATA VARIABLES:")?;
        if self.dataset.variables.is_empty() {
            writeln!(f, "  NO DATA VARIABLES FOUND")?;
        }
        for (name, var) in &self.dataset.variables {
            let shape: Vec<String> = var.shape.iter().map(|s| s.to_string()).collect();
            writeln!(f, "\n  {}", name)?;
            writeln!(f, "    Shape: ({})", shape.join(", "))?;
            writeln!(f, "    Dimensions: ({})", var.dims.join(", "))?;
            if !var.attrs.is_empty() {
                writeln!(f, "    Attributes:")?;
                for (key, value) in &var.attrs {
                    writeln!(
                        f,
                        "      - {}: {}",
                        key,
                        truncate(&value.to_string(), MAX_VAR_ATTR_LEN)
                    )?;
                }
            }

            let total = var.size();
            if total <= MAX_DATA_VALUES {
                writeln!(f, "    Data: {}", format_values(&var.data))?;
            } else {
                let valid = var.count_valid();
                writeln!(
                    f,
                    "    Non-NaN values: {}/{} ({:.1}%)",
                    valid,
                    total,
                    100.0 * valid as f64 / total as f64
                )?;
                if let Some((lo, hi)) = nan_min_max(&var.data) {
                    writeln!(f, "    Range: {} to {}", lo, hi)?;
                }
            }
        }
        Ok(())
    }

    fn global_attributes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section(f, "GLOBAL ATTRIBUTES:")?;
        if self.dataset.attrs.is_empty() {
            writeln!(f, "  No global attributes")?;
        }
        let mut attrs: Vec<_> = self.dataset.attrs.iter().collect();
        attrs.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in attrs {
            let shown = truncate(&value.to_string(), MAX_GLOBAL_ATTR_LEN);
            let marker = if KEY_ATTRIBUTES.contains(&key.as_str()) { "* " } else { "  " };
            writeln!(f, "  {}{}: {}", marker, key, shown)?;
        }
        Ok(())
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let rule = "=".repeat(80);
        writeln!(f, "{}\nINSPECTING: {}\n{}", rule, file_name, rule)?;
        writeln!(f, "\nFile: {}", self.path.display())?;
        write!(f, "{}", PreCheck::of(self.dataset))?;

        section(f, "DIMENSIONS:")?;
        for (dim, size) in self.dataset.dims() {
            writeln!(f, "  {}: {}", dim, size)?;
        }

        self.coordinates(f)?;
        self.variables(f)?;
        self.global_attributes(f)?;

        section(f, "SEARCHING FOR AOD/AEROSOL VARIABLES:")?;
        let found = find_aerosol_variables(self.dataset);
        if found.is_empty() {
            writeln!(f, "  No obvious AOD variables found")?;
            return writeln!(f, "  Check the full variable list above");
        }
        writeln!(f, "  Potential AOD variables found:")?;
        for name in found {
            writeln!(f, "    - {}", name)?;
        }
        Ok(())
    }
}

/// Full inspection report for an opened dataset.
pub fn report(dataset: &GridDataset, path: &Path) -> String {
    Report { dataset, path }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{AttrValue, Coordinate, Variable};

    fn sample() -> GridDataset {
        let lat = vec![
            47.0, 47.1, 47.2, 47.3, 47.4, 47.5, 47.6, 47.7, 47.8, 47.9, 48.0, 48.1,
        ];
        let mut data = vec![f64::NAN; 12 * 2];
        data[0] = 0.2;
        data[5] = 0.4;
        GridDataset::new()
            .with_attr("title", AttrValue::Text("x".repeat(200)))
            .with_attr("product_name", AttrValue::Text("PACE_OCI.L3m".into()))
            .with_coord("lat", Coordinate::new("lat", lat))
            .with_coord("lon", Coordinate::new("lon", vec![-122.3, -122.2]))
            .with_variable(
                "Aerosol_Optical_Depth_550",
                Variable::new(
                    "Aerosol_Optical_Depth_550",
                    vec!["lat".into(), "lon".into()],
                    vec![12, 2],
                    data,
                )
                .unwrap()
                .with_attr("long_name", AttrValue::Text("Aerosol optical depth".into())),
            )
            .with_variable(
                "chlor_a",
                Variable::new("chlor_a", vec!["lon".into()], vec![2], vec![1.0, 2.0]).unwrap(),
            )
    }

    #[test]
    fn test_precheck_counts() {
        let check = PreCheck::of(&sample());
        assert_eq!(check.variables, 2);
        assert_eq!(check.coordinates, 2);
        assert_eq!(check.dimensions, 2);
        assert_eq!(check.total_points, 24);
        assert!(!check.is_empty());
    }

    #[test]
    fn test_precheck_empty_warns() {
        let check = PreCheck::of(&GridDataset::new());
        assert!(check.is_empty());
        assert!(check.render().contains("Ocean Color"));
    }

    #[test]
    fn test_keyword_search_is_case_insensitive() {
        let ds = sample().with_variable(
            "AOT_869",
            Variable::new("AOT_869", vec![], vec![], vec![0.1]).unwrap(),
        );
        assert_eq!(
            find_aerosol_variables(&ds),
            vec!["Aerosol_Optical_Depth_550".to_string(), "AOT_869".to_string()]
        );
    }

    #[test]
    fn test_report_sections() {
        let text = report(&sample(), Path::new("/tmp/PACE_OCI.20250702.nc"));
        assert!(text.contains("INSPECTING: PACE_OCI.20250702.nc"));
        // 12 latitude values is above the listing limit
        assert!(text.contains("Range: 47 to 48.1"));
        assert!(text.contains("Values: [-122.3, -122.2]"));
        assert!(text.contains("Non-NaN values: 2/24 (8.3%)"));
        assert!(text.contains("Data: [1, 2]"));
        assert!(text.contains("* product_name: PACE_OCI.L3m"));
        assert!(text.contains(&format!("title: {}...", "x".repeat(120))));
        assert!(text.contains("Potential AOD variables found"));
    }
}
