//! Name resolution for the latitude/longitude axes and the measurement variable.
//!
//! Both resolvers are exact-match lookups in a fixed priority order. There is
//! no case folding or fuzzy matching: `aod_550` does not match `AOD_550nm`.

use crate::error::{AerosolError, Result};
use crate::grid::GridDataset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateNames {
    pub lat: String,
    pub lon: String,
}

fn first_present<'a>(aliases: &'a [String], present: impl Fn(&str) -> bool) -> Option<&'a String> {
    aliases.iter().find(|alias| present(alias.as_str()))
}

/// Finds the latitude and longitude coordinate names. Each axis is resolved
/// independently; both must be found.
pub fn resolve_coordinates(
    dataset: &GridDataset,
    lat_aliases: &[String],
    lon_aliases: &[String],
) -> Result<CoordinateNames> {
    let present = |name: &str| dataset.coords.contains_key(name);
    match (
        first_present(lat_aliases, present),
        first_present(lon_aliases, present),
    ) {
        (Some(lat), Some(lon)) => Ok(CoordinateNames {
            lat: lat.clone(),
            lon: lon.clone(),
        }),
        _ => Err(AerosolError::CoordinatesNotFound {
            lat_tried: lat_aliases.to_vec(),
            lon_tried: lon_aliases.to_vec(),
            available: dataset.coord_names(),
        }),
    }
}

/// Returns the first candidate present among the dataset's data variables.
pub fn resolve_variable(dataset: &GridDataset, candidates: &[String]) -> Result<String> {
    candidates
        .iter()
        .find(|c| dataset.variables.contains_key(c.as_str()))
        .cloned()
        .ok_or_else(|| AerosolError::VariableNotFound {
            candidates: candidates.to_vec(),
            available: dataset.variable_names(),
        })
}
