//! Bounding-box filtering and the "is there any real data in here" check.
//!
//! Filtering shrinks the grid to the minimum enclosing subgrid. With 1-D
//! latitude and longitude axes the box mask is separable, so every cell of the
//! subgrid is inside the box and no sentinel filling is needed. When both axes
//! share one dimension (a list of points) an index is kept only when both its
//! latitude and longitude are inside. Variables that depend on neither masked
//! dimension are left out of the filtered view. A variable spanning only one
//! masked dimension stands for every cell along the other, so it is emptied
//! when the box keeps nothing on the dimension it lacks.

use crate::config::BoundingBox;
use crate::error::{AerosolError, Result};
use crate::grid::GridDataset;
use crate::resolve::CoordinateNames;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxStatus {
    /// At least one non-sentinel value inside the box.
    Valid,
    /// No grid cell of the variable falls inside the box.
    EmptyIntersection,
    /// Cells intersect the box but every value is the sentinel.
    AllMasked,
}

impl BoxStatus {
    pub fn reason(&self) -> &'static str {
        match self {
            BoxStatus::Valid => "valid data in bounding box",
            BoxStatus::EmptyIntersection => "no data in bounding box",
            BoxStatus::AllMasked => {
                "all values in bounding box are masked (likely cloud/quality flags, or an ocean-only product over land)"
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoxValidation {
    pub is_valid: bool,
    pub valid_point_count: usize,
    pub status: BoxStatus,
    pub filtered_view: GridDataset,
}

/// Index lists to keep along each masked dimension.
fn kept_indices(
    dataset: &GridDataset,
    coords: &CoordinateNames,
    bbox: &BoundingBox,
) -> Result<Vec<(String, Vec<usize>)>> {
    let lat = dataset
        .coord(&coords.lat)
        .ok_or_else(|| coordinate_missing(dataset, coords))?;
    let lon = dataset
        .coord(&coords.lon)
        .ok_or_else(|| coordinate_missing(dataset, coords))?;

    if lat.dim == lon.dim {
        if lat.len() != lon.len() {
            return Err(AerosolError::ShapeMismatch {
                name: coords.lon.clone(),
                detail: format!(
                    "shares dimension '{}' with '{}' but has {} values instead of {}",
                    lat.dim,
                    coords.lat,
                    lon.len(),
                    lat.len()
                ),
            });
        }
        let keep = (0..lat.len())
            .filter(|&i| bbox.contains(lat.values[i], lon.values[i]))
            .collect();
        return Ok(vec![(lat.dim.clone(), keep)]);
    }

    let keep_lat = (0..lat.len())
        .filter(|&i| bbox.contains_lat(lat.values[i]))
        .collect();
    let keep_lon = (0..lon.len())
        .filter(|&i| bbox.contains_lon(lon.values[i]))
        .collect();
    Ok(vec![(lat.dim.clone(), keep_lat), (lon.dim.clone(), keep_lon)])
}

fn coordinate_missing(dataset: &GridDataset, coords: &CoordinateNames) -> AerosolError {
    AerosolError::CoordinatesNotFound {
        lat_tried: vec![coords.lat.clone()],
        lon_tried: vec![coords.lon.clone()],
        available: dataset.coord_names(),
    }
}

/// Restricts the dataset to the bounding box. The source is not modified.
pub fn filter_to_bbox(
    dataset: &GridDataset,
    coords: &CoordinateNames,
    bbox: &BoundingBox,
) -> Result<GridDataset> {
    let keep = kept_indices(dataset, coords, bbox)?;
    let masked_dim = |dim: &str| keep.iter().find(|(d, _)| d == dim).map(|(_, k)| k);

    let mut view = GridDataset {
        attrs: dataset.attrs.clone(),
        ..GridDataset::default()
    };

    for (name, coord) in &dataset.coords {
        let filtered = match masked_dim(&coord.dim) {
            Some(k) => coord.take(k),
            None => coord.clone(),
        };
        view.coords.insert(name.clone(), filtered);
    }

    for (name, var) in &dataset.variables {
        if !var.dims.iter().any(|d| masked_dim(d).is_some()) {
            debug!(variable = %name, "no spatial dimension, left out of filtered view");
            continue;
        }
        let outside = keep
            .iter()
            .any(|(dim, k)| k.is_empty() && var.axis_of(dim).is_none());
        let mut filtered = var.clone();
        for (dim, k) in &keep {
            if let Some(axis) = filtered.axis_of(dim) {
                let k: &[usize] = if outside { &[] } else { k };
                filtered = filtered.take_along(axis, k);
            }
        }
        view.variables.insert(name.clone(), filtered);
    }

    Ok(view)
}

/// Checks a filtered view for non-sentinel values of `variable`.
pub fn assess_view(view: GridDataset, variable: &str) -> BoxValidation {
    let count = match view.variable(variable) {
        None => None,
        Some(var) if var.size() == 0 => None,
        Some(var) => Some(var.count_valid()),
    };

    let (status, valid_point_count) = match count {
        None => (BoxStatus::EmptyIntersection, 0),
        Some(0) => (BoxStatus::AllMasked, 0),
        Some(n) => (BoxStatus::Valid, n),
    };

    BoxValidation {
        is_valid: status == BoxStatus::Valid,
        valid_point_count,
        status,
        filtered_view: view,
    }
}

/// Filters to the box and reports whether `variable` has any data left.
///
/// Empty intersections and fully masked boxes are normal outcomes carried in
/// [`BoxStatus`]; only a coordinate that is not in the dataset is an error.
pub fn validate_in_bbox(
    dataset: &GridDataset,
    variable: &str,
    coords: &CoordinateNames,
    bbox: &BoundingBox,
) -> Result<BoxValidation> {
    let view = filter_to_bbox(dataset, coords, bbox)?;
    let validation = assess_view(view, variable);
    debug!(
        variable,
        status = ?validation.status,
        count = validation.valid_point_count,
        "bounding box validation"
    );
    Ok(validation)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::SEATTLE_BBOX;
    use crate::grid::{Coordinate, Variable};
    use proptest::prelude::*;

    pub(crate) fn seattle_grid(values: Vec<f64>) -> GridDataset {
        GridDataset::new()
            .with_coord("lat", Coordinate::new("lat", vec![47.5, 47.6]))
            .with_coord("lon", Coordinate::new("lon", vec![-122.3, -122.2]))
            .with_variable(
                "Aerosol_Optical_Depth_550",
                Variable::new(
                    "Aerosol_Optical_Depth_550",
                    vec!["lat".into(), "lon".into()],
                    vec![2, 2],
                    values,
                )
                .unwrap(),
            )
    }

    pub(crate) fn lat_lon() -> CoordinateNames {
        CoordinateNames {
            lat: "lat".into(),
            lon: "lon".into(),
        }
    }

    #[test]
    fn test_single_valid_point() {
        let ds = seattle_grid(vec![0.15, f64::NAN, f64::NAN, f64::NAN]);
        let result =
            validate_in_bbox(&ds, "Aerosol_Optical_Depth_550", &lat_lon(), &SEATTLE_BBOX).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.valid_point_count, 1);
        assert_eq!(result.status, BoxStatus::Valid);
    }

    #[test]
    fn test_all_masked() {
        let ds = seattle_grid(vec![f64::NAN; 4]);
        let result =
            validate_in_bbox(&ds, "Aerosol_Optical_Depth_550", &lat_lon(), &SEATTLE_BBOX).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.valid_point_count, 0);
        assert_eq!(result.status, BoxStatus::AllMasked);
    }

    #[test]
    fn test_box_outside_grid_is_empty_not_error() {
        let ds = seattle_grid(vec![0.1, 0.2, 0.3, 0.4]);
        let bbox = BoundingBox::new(10.0, 10.0, 11.0, 11.0).unwrap();
        let result = validate_in_bbox(&ds, "Aerosol_Optical_Depth_550", &lat_lon(), &bbox).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.valid_point_count, 0);
        assert_eq!(result.status, BoxStatus::EmptyIntersection);
        let var = result
            .filtered_view
            .variable("Aerosol_Optical_Depth_550")
            .unwrap();
        assert_eq!(var.shape, vec![0, 0]);
        assert_eq!(crate::grid::nan_min_max(&var.data), None);
    }

    #[test]
    fn test_partial_overlap_shrinks_grid() {
        let ds = seattle_grid(vec![0.1, 0.2, 0.3, 0.4]);
        let bbox = BoundingBox::new(-122.35, 47.55, -122.25, 47.65).unwrap();
        let result = validate_in_bbox(&ds, "Aerosol_Optical_Depth_550", &lat_lon(), &bbox).unwrap();
        let view = &result.filtered_view;
        assert_eq!(view.coord("lat").unwrap().values, vec![47.6]);
        assert_eq!(view.coord("lon").unwrap().values, vec![-122.3]);
        assert_eq!(
            view.variable("Aerosol_Optical_Depth_550").unwrap().data,
            vec![0.3]
        );
        assert_eq!(result.valid_point_count, 1);
    }

    #[test]
    fn test_variable_without_spatial_dims_is_dropped() {
        let ds = seattle_grid(vec![0.1, 0.2, 0.3, 0.4]).with_variable(
            "palette",
            Variable::new("palette", vec!["rgb".into()], vec![3], vec![1.0, 2.0, 3.0]).unwrap(),
        );
        let result = validate_in_bbox(&ds, "palette", &lat_lon(), &SEATTLE_BBOX).unwrap();
        assert_eq!(result.status, BoxStatus::EmptyIntersection);
        assert!(result.filtered_view.variable("palette").is_none());
    }

    #[test]
    fn test_latitude_only_variable_needs_longitude_in_box() {
        let ds = GridDataset::new()
            .with_coord("lat", Coordinate::new("lat", vec![47.5]))
            .with_coord("lon", Coordinate::new("lon", vec![10.0]))
            .with_variable(
                "aod",
                Variable::new("aod", vec!["lat".into()], vec![1], vec![0.2]).unwrap(),
            );
        let result = validate_in_bbox(&ds, "aod", &lat_lon(), &SEATTLE_BBOX).unwrap();
        assert_eq!(result.status, BoxStatus::EmptyIntersection);
        assert!(!result.is_valid);
        assert_eq!(result.valid_point_count, 0);
        assert_eq!(result.filtered_view.variable("aod").unwrap().shape, vec![0]);

        let inside = ds.with_coord("lon", Coordinate::new("lon", vec![-122.3]));
        let result = validate_in_bbox(&inside, "aod", &lat_lon(), &SEATTLE_BBOX).unwrap();
        assert_eq!(result.status, BoxStatus::Valid);
        assert_eq!(result.valid_point_count, 1);
    }

    #[test]
    fn test_shared_dimension_points() {
        let ds = GridDataset::new()
            .with_coord("lat", Coordinate::new("obs", vec![47.5, 47.5, 50.0]))
            .with_coord("lon", Coordinate::new("obs", vec![-122.3, -100.0, -122.3]))
            .with_variable(
                "aod",
                Variable::new("aod", vec!["obs".into()], vec![3], vec![0.2, 0.3, 0.4]).unwrap(),
            );
        let result = validate_in_bbox(&ds, "aod", &lat_lon(), &SEATTLE_BBOX).unwrap();
        assert_eq!(result.valid_point_count, 1);
        assert_eq!(result.filtered_view.variable("aod").unwrap().data, vec![0.2]);
    }

    #[test]
    fn test_source_untouched_and_revalidation_stable() {
        let ds = seattle_grid(vec![0.15, f64::NAN, 0.2, f64::NAN]);
        let before = ds.clone();
        let first =
            validate_in_bbox(&ds, "Aerosol_Optical_Depth_550", &lat_lon(), &SEATTLE_BBOX).unwrap();
        assert_eq!(ds.coords, before.coords);
        let second = validate_in_bbox(
            &first.filtered_view,
            "Aerosol_Optical_Depth_550",
            &lat_lon(),
            &SEATTLE_BBOX,
        )
        .unwrap();
        assert_eq!(first.valid_point_count, second.valid_point_count);
        assert_eq!(second.valid_point_count, 2);
    }

    #[test]
    fn test_unknown_coordinate_is_error() {
        let ds = seattle_grid(vec![0.1; 4]);
        let names = CoordinateNames {
            lat: "latitude".into(),
            lon: "lon".into(),
        };
        assert!(matches!(
            validate_in_bbox(&ds, "Aerosol_Optical_Depth_550", &names, &SEATTLE_BBOX),
            Err(AerosolError::CoordinatesNotFound { .. })
        ));
    }

    fn grid_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<f64>, Vec<Option<f64>>)> {
        (1usize..6, 1usize..6).prop_flat_map(|(nlat, nlon)| {
            (
                prop::collection::vec(45.0f64..50.0, nlat),
                prop::collection::vec(-124.0f64..-120.0, nlon),
                prop::collection::vec(prop::option::of(0.0f64..2.0), nlat * nlon),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_filtered_coords_inside_box(
            (lats, lons, cells) in grid_strategy(),
            west in -124.0f64..-122.0,
            south in 45.0f64..47.5,
        ) {
            let bbox = BoundingBox::new(west, south, west + 1.5, south + 1.5).unwrap();
            let nlat = lats.len();
            let nlon = lons.len();
            let values: Vec<f64> = cells.iter().map(|c| c.unwrap_or(f64::NAN)).collect();
            let ds = GridDataset::new()
                .with_coord("lat", Coordinate::new("lat", lats))
                .with_coord("lon", Coordinate::new("lon", lons))
                .with_variable(
                    "aod",
                    Variable::new("aod", vec!["lat".into(), "lon".into()], vec![nlat, nlon], values)
                        .unwrap(),
                );

            let result = validate_in_bbox(&ds, "aod", &lat_lon(), &bbox).unwrap();
            let view = &result.filtered_view;
            for lat in &view.coord("lat").unwrap().values {
                prop_assert!(bbox.contains_lat(*lat));
            }
            for lon in &view.coord("lon").unwrap().values {
                prop_assert!(bbox.contains_lon(*lon));
            }

            let expected = view.variable("aod").map(|v| v.count_valid()).unwrap_or(0);
            prop_assert_eq!(result.valid_point_count, expected);
            prop_assert_eq!(result.is_valid, expected > 0);
        }
    }
}
