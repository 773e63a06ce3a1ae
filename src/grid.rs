//! In-memory grid dataset: named N-d float variables, 1-D coordinate axes and
//! free-form attributes. Missing cells hold `f64::NAN`.

use crate::error::{AerosolError, Result};
use indexmap::IndexMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(v) => Some(*v),
            AttrValue::Numbers(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::Number(v) => write!(f, "{}", v),
            AttrValue::Numbers(v) => write!(f, "{:?}", v),
        }
    }
}

pub type Attributes = IndexMap<String, AttrValue>;

/// Row-major N-d array. The last dimension varies fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
    pub attrs: Attributes,
}

impl Variable {
    pub fn new(name: &str, dims: Vec<String>, shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        if dims.len() != shape.len() {
            return Err(AerosolError::ShapeMismatch {
                name: name.to_string(),
                detail: format!("{} dimension names for {} axes", dims.len(), shape.len()),
            });
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(AerosolError::ShapeMismatch {
                name: name.to_string(),
                detail: format!("shape {:?} needs {} values, got {}", shape, expected, data.len()),
            });
        }
        Ok(Variable {
            dims,
            shape,
            data,
            attrs: Attributes::new(),
        })
    }

    pub fn with_attr(mut self, key: &str, value: AttrValue) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn long_name(&self) -> Option<&str> {
        self.attrs.get("long_name").and_then(|v| v.as_text())
    }

    pub fn units(&self) -> Option<&str> {
        self.attrs.get("units").and_then(|v| v.as_text())
    }

    /// Number of non-sentinel cells.
    pub fn count_valid(&self) -> usize {
        count_valid(&self.data)
    }

    /// Keep only `keep` indices along `axis`, in the given order.
    pub(crate) fn take_along(&self, axis: usize, keep: &[usize]) -> Variable {
        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();
        let len = self.shape[axis];

        let mut data = Vec::with_capacity(outer * keep.len() * inner);
        for o in 0..outer {
            for &k in keep {
                let start = (o * len + k) * inner;
                data.extend_from_slice(&self.data[start..start + inner]);
            }
        }

        let mut shape = self.shape.clone();
        shape[axis] = keep.len();
        Variable {
            dims: self.dims.clone(),
            shape,
            data,
            attrs: self.attrs.clone(),
        }
    }
}

/// 1-D axis along one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub dim: String,
    pub values: Vec<f64>,
    /// Decoded time strings, one per value.
    pub labels: Option<Vec<String>>,
    pub attrs: Attributes,
}

impl Coordinate {
    pub fn new(dim: &str, values: Vec<f64>) -> Self {
        Coordinate {
            dim: dim.to_string(),
            values,
            labels: None,
            attrs: Attributes::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn take(&self, keep: &[usize]) -> Coordinate {
        Coordinate {
            dim: self.dim.clone(),
            values: keep.iter().map(|&i| self.values[i]).collect(),
            labels: self
                .labels
                .as_ref()
                .map(|l| keep.iter().map(|&i| l[i].clone()).collect()),
            attrs: self.attrs.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridDataset {
    pub variables: IndexMap<String, Variable>,
    pub coords: IndexMap<String, Coordinate>,
    pub attrs: Attributes,
}

impl GridDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coord(mut self, name: &str, coord: Coordinate) -> Self {
        self.coords.insert(name.to_string(), coord);
        self
    }

    pub fn with_variable(mut self, name: &str, var: Variable) -> Self {
        self.variables.insert(name.to_string(), var);
        self
    }

    pub fn with_attr(mut self, key: &str, value: AttrValue) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.get(name)
    }

    pub fn attr_text(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_text())
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    pub fn coord_names(&self) -> Vec<String> {
        self.coords.keys().cloned().collect()
    }

    /// Dimension sizes, in first-seen order across coordinates then variables.
    pub fn dims(&self) -> IndexMap<String, usize> {
        let mut dims = IndexMap::new();
        for coord in self.coords.values() {
            dims.entry(coord.dim.clone()).or_insert(coord.len());
        }
        for var in self.variables.values() {
            for (d, &n) in var.dims.iter().zip(&var.shape) {
                dims.entry(d.clone()).or_insert(n);
            }
        }
        dims
    }

    /// Coordinate that indexes `dim`, if any.
    pub fn coord_for_dim(&self, dim: &str) -> Option<(&String, &Coordinate)> {
        self.coords
            .get_key_value(dim)
            .filter(|(_, c)| c.dim == dim)
            .or_else(|| self.coords.iter().find(|(_, c)| c.dim == dim))
    }
}

/// Walks every multi-index of `shape` in row-major order.
#[derive(Debug, Clone)]
pub struct IndexIter {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl IndexIter {
    pub fn new(shape: &[usize]) -> Self {
        let next = if shape.iter().any(|&n| n == 0) {
            None
        } else {
            Some(vec![0; shape.len()])
        };
        IndexIter {
            shape: shape.to_vec(),
            next,
        }
    }
}

impl Iterator for IndexIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut following = current.clone();
        let mut axis = self.shape.len();
        loop {
            if axis == 0 {
                // wrapped past the first axis
                break;
            }
            axis -= 1;
            following[axis] += 1;
            if following[axis] < self.shape[axis] {
                self.next = Some(following);
                break;
            }
            following[axis] = 0;
        }
        Some(current)
    }
}

pub fn count_valid(values: &[f64]) -> usize {
    values.iter().filter(|v| !v.is_nan()).count()
}

/// Min and max ignoring NaN. `None` for empty or all-NaN input.
pub fn nan_min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Mean ignoring NaN. `None` for empty or all-NaN input.
pub fn nan_mean(values: &[f64]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var_2x3() -> Variable {
        Variable::new(
            "v",
            vec!["lat".into(), "lon".into()],
            vec![2, 3],
            vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0],
        )
        .unwrap()
    }

    #[test]
    fn test_variable_shape_checked() {
        let err = Variable::new("v", vec!["x".into()], vec![3], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, AerosolError::ShapeMismatch { .. }));
        let err = Variable::new("v", vec!["x".into(), "y".into()], vec![2], vec![1.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, AerosolError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_take_along_inner_axis() {
        let v = var_2x3().take_along(1, &[0, 2]);
        assert_eq!(v.shape, vec![2, 2]);
        assert_eq!(v.data, vec![0.0, 2.0, 10.0, 12.0]);
    }

    #[test]
    fn test_take_along_outer_axis_to_empty() {
        let v = var_2x3().take_along(0, &[]);
        assert_eq!(v.shape, vec![0, 3]);
        assert!(v.data.is_empty());
    }

    #[test]
    fn test_index_iter_row_major() {
        let idx: Vec<Vec<usize>> = IndexIter::new(&[2, 2]).collect();
        assert_eq!(idx, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
        assert_eq!(IndexIter::new(&[3, 0]).count(), 0);
        // a scalar has exactly one (empty) index
        assert_eq!(IndexIter::new(&[]).count(), 1);
    }

    #[test]
    fn test_reductions_on_empty_are_none() {
        assert_eq!(nan_min_max(&[]), None);
        assert_eq!(nan_min_max(&[f64::NAN, f64::NAN]), None);
        assert_eq!(nan_mean(&[]), None);
        assert_eq!(nan_min_max(&[3.0, f64::NAN, -1.0]), Some((-1.0, 3.0)));
        assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), Some(2.0));
    }

    #[test]
    fn test_dims_and_coord_lookup() {
        let ds = GridDataset::new()
            .with_coord("latitude", Coordinate::new("lat", vec![1.0, 2.0]))
            .with_variable("v", var_2x3());
        let dims = ds.dims();
        assert_eq!(dims.get("lat"), Some(&2));
        assert_eq!(dims.get("lon"), Some(&3));
        let (name, _) = ds.coord_for_dim("lat").unwrap();
        assert_eq!(name, "latitude");
        assert!(ds.coord_for_dim("lon").is_none());
    }
}
