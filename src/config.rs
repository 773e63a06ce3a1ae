use crate::error::{AerosolError, Result};
use std::fmt;
use std::str::FromStr;

// Tight box around the Seattle metro area
pub const SEATTLE_BBOX: BoundingBox = BoundingBox {
    west: -122.4,
    south: 47.4,
    east: -122.2,
    north: 47.7,
};

/// Known AOD field names, best first. The combined Dark Target + Deep Blue
/// product wins over the single-algorithm ones.
pub const AOD_VARIABLE_CANDIDATES: &[&str] = &[
    // PACE OCI
    "Aerosol_Optical_Depth_550",
    // VIIRS (NOAA-20, NOAA-21, Suomi NPP)
    "COMBINE_AOD_550_AVG",
    "DT_AOD_550_AVG",
    "DB_AOD_550_AVG",
    "DT_DB_AOD_550_AVG",
    "DB_DT_AOD_550_AVG",
    // MODIS / other
    "Optical_Depth_Land_And_Ocean",
    "AOD_550nm_Combined_Mean",
    "Aerosol_Optical_Depth_550nm_Mean",
    "AOD_550nm",
    "Deep_Blue_Aerosol_Optical_Depth_550_Land_Mean",
    "Dark_Target_Aerosol_Optical_Depth_550_Ocean_Mean",
];

pub const LAT_ALIASES: &[&str] = &["lat", "latitude", "Latitude", "LAT"];
pub const LON_ALIASES: &[&str] = &["lon", "longitude", "Longitude", "LON"];

pub const CMR_COLLECTIONS_URL: &str = "https://cmr.earthdata.nasa.gov/search/collections.json";
pub const CMR_GRANULES_URL: &str = "https://cmr.earthdata.nasa.gov/search/granules.json";

// (keyword, platform label)
pub const CMR_PLATFORM_QUERIES: &[(&str, &str)] = &[
    ("PACE OCI aerosol", "PACE / OCI"),
    ("NOAA-21 VIIRS aerosol", "NOAA-21 VIIRS"),
    ("JPSS-2 VIIRS aerosol", "NOAA-21 VIIRS (JPSS-2)"),
    ("NOAA-20 VIIRS aerosol", "NOAA-20 VIIRS"),
    ("Suomi NPP VIIRS aerosol", "Suomi NPP VIIRS"),
];

pub const DEFAULT_SCAN_DIR: &str = "./data/results_downloads";
pub const DEFAULT_GEOJSON_DIR: &str = "data/geojson";

/// Geographic rectangle in degrees. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return Err(AerosolError::InvalidBoundingBox(
                "all edges must be finite numbers".to_string(),
            ));
        }
        if west >= east {
            return Err(AerosolError::InvalidBoundingBox(format!(
                "west ({}) must be less than east ({})",
                west, east
            )));
        }
        if south >= north {
            return Err(AerosolError::InvalidBoundingBox(format!(
                "south ({}) must be less than north ({})",
                south, north
            )));
        }
        Ok(BoundingBox {
            west,
            south,
            east,
            north,
        })
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        self.south <= lat && lat <= self.north
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        self.west <= lon && lon <= self.east
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.contains_lat(lat) && self.contains_lon(lon)
    }

    /// `west,south,east,north`, the order CMR expects for `bounding_box`.
    pub fn to_cmr_param(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lat {}-{}, Lon {}-{}",
            self.south, self.north, self.west, self.east
        )
    }
}

impl FromStr for BoundingBox {
    type Err = AerosolError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| AerosolError::InvalidBoundingBox(format!("'{}': {}", s, e)))?;
        match parts.as_slice() {
            [west, south, east, north] => BoundingBox::new(*west, *south, *east, *north),
            _ => Err(AerosolError::InvalidBoundingBox(format!(
                "expected west,south,east,north but got '{}'",
                s
            ))),
        }
    }
}

/// Names and region used by the resolvers and the validator. Built once per run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub bbox: BoundingBox,
    pub variable_candidates: Vec<String>,
    pub lat_aliases: Vec<String>,
    pub lon_aliases: Vec<String>,
}

impl AnalysisConfig {
    pub fn seattle() -> Self {
        AnalysisConfig {
            bbox: SEATTLE_BBOX,
            variable_candidates: AOD_VARIABLE_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            lat_aliases: LAT_ALIASES.iter().map(|s| s.to_string()).collect(),
            lon_aliases: LON_ALIASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = bbox;
        self
    }

    /// Put extra candidates ahead of the built-in list, skipping duplicates.
    pub fn with_preferred_variables(mut self, preferred: &[String]) -> Self {
        let mut candidates: Vec<String> = preferred.to_vec();
        candidates.extend(
            self.variable_candidates
                .into_iter()
                .filter(|c| !preferred.contains(c)),
        );
        self.variable_candidates = candidates;
        self
    }

    /// Whether the variable is one of the built-in AOD names.
    pub fn is_aod_variable(name: &str) -> bool {
        AOD_VARIABLE_CANDIDATES.contains(&name)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::seattle()
    }
}

// Time axis handling when opening a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeDecoding {
    /// Leave time values as stored numbers.
    #[default]
    Raw,
    /// Decode CF "<unit> since <date>" into ISO-8601 labels, failing on bad units.
    Strict,
}

// Export targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Parquet,
    VariableCsv,
    Info,
    SubsetCsv,
    SubsetNetcdf,
    Geojson,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_rejects_inverted_edges() {
        assert!(BoundingBox::new(-122.2, 47.4, -122.4, 47.7).is_err());
        assert!(BoundingBox::new(-122.4, 47.7, -122.2, 47.4).is_err());
        assert!(BoundingBox::new(f64::NAN, 47.4, -122.2, 47.7).is_err());
        assert!(BoundingBox::new(-122.4, 47.4, -122.2, 47.7).is_ok());
    }

    #[test]
    fn test_bbox_from_str() {
        let bbox: BoundingBox = "-122.4, 47.4, -122.2, 47.7".parse().unwrap();
        assert_eq!(bbox, SEATTLE_BBOX);
        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn test_bbox_edges_inclusive() {
        assert!(SEATTLE_BBOX.contains(47.4, -122.4));
        assert!(SEATTLE_BBOX.contains(47.7, -122.2));
        assert!(!SEATTLE_BBOX.contains(47.71, -122.3));
        assert!(!SEATTLE_BBOX.contains(f64::NAN, -122.3));
    }

    #[test]
    fn test_cmr_param_order() {
        assert_eq!(SEATTLE_BBOX.to_cmr_param(), "-122.4,47.4,-122.2,47.7");
    }

    #[test]
    fn test_preferred_variables_go_first() {
        let config = AnalysisConfig::seattle()
            .with_preferred_variables(&["DT_AOD_550_AVG".to_string(), "my_aod".to_string()]);
        assert_eq!(config.variable_candidates[0], "DT_AOD_550_AVG");
        assert_eq!(config.variable_candidates[1], "my_aod");
        assert_eq!(
            config
                .variable_candidates
                .iter()
                .filter(|c| *c == "DT_AOD_550_AVG")
                .count(),
            1
        );
    }
}
