//! GeoJSON point feature collections for export.

use crate::config::AnalysisConfig;
use crate::grid::GridDataset;
use crate::points::PointFeature;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionMetadata {
    pub source_product: String,
    pub time_start: String,
    pub time_end: String,
    pub variable_description: String,
    pub variable_name: String,
}

impl CollectionMetadata {
    /// Pulls product and time coverage from global attributes, falling back
    /// to the file name and `N/A`.
    pub fn from_dataset(dataset: &GridDataset, variable: &str, source_path: &Path) -> Self {
        let attr_or = |keys: &[&str], fallback: &str| {
            keys.iter()
                .find_map(|k| dataset.attrs.get(*k).map(|v| v.to_string()))
                .unwrap_or_else(|| fallback.to_string())
        };
        let file_name = source_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        CollectionMetadata {
            source_product: attr_or(&["product_name"], &file_name),
            time_start: attr_or(&["time_coverage_start", "RangeBeginningDate"], "N/A"),
            time_end: attr_or(&["time_coverage_end", "RangeEndingDate"], "N/A"),
            variable_description: dataset
                .variable(variable)
                .and_then(|v| v.long_name())
                .unwrap_or("Aerosol Optical Depth")
                .to_string(),
            variable_name: variable.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        /// `[longitude, latitude]`
        coordinates: [f64; 2],
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    #[serde(rename = "type")]
    pub type_: String,
    pub geometry: Geometry,
    pub properties: IndexMap<String, f64>,
}

impl Feature {
    pub fn from_point(point: &PointFeature, value_key: &str) -> Self {
        let mut properties = IndexMap::new();
        properties.insert(value_key.to_string(), point.value);
        properties.insert("lat".to_string(), point.lat);
        properties.insert("lon".to_string(), point.lon);
        Feature {
            type_: "Feature".to_string(),
            geometry: Geometry::Point {
                coordinates: [point.lon, point.lat],
            },
            properties,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub type_: String,
    pub metadata: CollectionMetadata,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn from_points(
        metadata: CollectionMetadata,
        points: impl IntoIterator<Item = PointFeature>,
    ) -> Self {
        let key = value_key(&metadata.variable_name);
        FeatureCollection {
            type_: "FeatureCollection".to_string(),
            features: points
                .into_iter()
                .map(|p| Feature::from_point(&p, key))
                .collect(),
            metadata,
        }
    }
}

/// Property name for the measurement: `aod` for optical-depth fields.
pub fn value_key(variable: &str) -> &'static str {
    let lower = variable.to_lowercase();
    if AnalysisConfig::is_aod_variable(variable)
        || lower.contains("aod")
        || lower.contains("optical_depth")
    {
        "aod"
    } else {
        "value"
    }
}

/// `seattle_aod_{satellite}_{date}{resolution}.geojson` from a granule file name.
pub fn output_filename(source_path: &Path) -> String {
    let base = source_path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut satellite = "";
    let mut date = "undated".to_string();

    if let Some(rest) = base.split("PACE_OCI.").nth(1) {
        satellite = "PACE";
        if let Some(d) = rest.split('.').next() {
            date = d.to_string();
        }
    } else if base.contains("VIIRS") {
        if let Some(d) = base.split('.').find(|p| is_julian_date(p)) {
            date = d.to_string();
        }
        satellite = if base.contains("NOAA20") {
            "NOAA20"
        } else if base.contains("NOAA21") || base.contains("JPSS2") {
            "NOAA21"
        } else if base.contains("NPP") {
            "NPP"
        } else {
            "VIIRS"
        };
    }

    let resolution = if base.contains("0p1deg") || base.contains("0.1deg") {
        "_0p1deg"
    } else if base.contains("1deg") {
        "_1deg"
    } else if base.contains("D10KM") {
        "_10km"
    } else {
        ""
    };

    format!("seattle_aod_{}_{}{}.geojson", satellite, date, resolution)
}

// YYYYDDD
fn is_julian_date(s: &str) -> bool {
    s.len() == 7
        && s.bytes().all(|b| b.is_ascii_digit())
        && s[..4].parse::<u32>().is_ok_and(|y| (1990..2100).contains(&y))
}
