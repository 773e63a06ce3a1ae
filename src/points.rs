//! Flattens a (filtered) grid into `(lat, lon, value)` point features.

use crate::error::{AerosolError, Result};
use crate::grid::{Coordinate, GridDataset, IndexIter, Variable};
use crate::resolve::CoordinateNames;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointFeature {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

/// Lazily yields one point per non-sentinel cell, in the variable's row-major
/// order. Call [`extract_points`] again to restart.
pub struct PointIter<'a> {
    var: &'a Variable,
    lat: &'a Coordinate,
    lon: &'a Coordinate,
    lat_axis: usize,
    lon_axis: usize,
    indices: IndexIter,
    flat: usize,
}

impl Iterator for PointIter<'_> {
    type Item = PointFeature;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let index = self.indices.next()?;
            let value = self.var.data[self.flat];
            self.flat += 1;
            if value.is_nan() {
                continue;
            }
            return Some(PointFeature {
                lat: self.lat.values[index[self.lat_axis]],
                lon: self.lon.values[index[self.lon_axis]],
                value,
            });
        }
    }
}

pub fn extract_points<'a>(
    view: &'a GridDataset,
    variable: &str,
    coords: &CoordinateNames,
) -> Result<PointIter<'a>> {
    let var = view
        .variable(variable)
        .ok_or_else(|| AerosolError::VariableNotFound {
            candidates: vec![variable.to_string()],
            available: view.variable_names(),
        })?;
    let missing_coords = || AerosolError::CoordinatesNotFound {
        lat_tried: vec![coords.lat.clone()],
        lon_tried: vec![coords.lon.clone()],
        available: view.coord_names(),
    };
    let lat = view.coord(&coords.lat).ok_or_else(missing_coords)?;
    let lon = view.coord(&coords.lon).ok_or_else(missing_coords)?;

    let axis = |coord: &Coordinate| {
        var.axis_of(&coord.dim)
            .ok_or_else(|| AerosolError::MissingDimension {
                variable: variable.to_string(),
                dimension: coord.dim.clone(),
            })
    };
    let lat_axis = axis(lat)?;
    let lon_axis = axis(lon)?;

    for (coord, ax) in [(lat, lat_axis), (lon, lon_axis)] {
        if coord.len() != var.shape[ax] {
            return Err(AerosolError::ShapeMismatch {
                name: variable.to_string(),
                detail: format!(
                    "dimension '{}' has {} cells but its coordinate has {} values",
                    coord.dim,
                    var.shape[ax],
                    coord.len()
                ),
            });
        }
    }

    Ok(PointIter {
        var,
        lat,
        lon,
        lat_axis,
        lon_axis,
        indices: IndexIter::new(&var.shape),
        flat: 0,
    })
}
