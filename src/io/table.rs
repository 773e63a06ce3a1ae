//! Flat column tables built from grid variables, shared by the CSV and
//! Parquet writers.

use crate::error::{AerosolError, Result};
use crate::grid::{GridDataset, IndexIter};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell(&self, row: usize) -> String {
        match self {
            Column::Float(v) if v[row].is_nan() => String::new(),
            Column::Float(v) => v[row].to_string(),
            Column::Text(v) => v[row].clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatTable {
    pub headers: Vec<String>,
    pub columns: Vec<Column>,
}

impl FlatTable {
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// One row per grid cell: a column per dimension (coordinate value, time
    /// label or integer index) followed by a column per variable. All
    /// variables must share the first one's dimensions.
    pub fn from_variables(dataset: &GridDataset, names: &[String]) -> Result<Self> {
        let template = names
            .first()
            .and_then(|n| dataset.variable(n))
            .ok_or_else(|| AerosolError::VariableNotFound {
                candidates: names.to_vec(),
                available: dataset.variable_names(),
            })?;

        let mut headers = Vec::new();
        let mut dim_columns: Vec<Column> = Vec::new();

        for dim in &template.dims {
            match dataset.coord_for_dim(dim) {
                Some((name, coord)) => {
                    headers.push(name.clone());
                    dim_columns.push(match &coord.labels {
                        Some(_) => Column::Text(Vec::new()),
                        None => Column::Float(Vec::new()),
                    });
                }
                None => {
                    headers.push(dim.clone());
                    dim_columns.push(Column::Float(Vec::new()));
                }
            }
        }

        for index in IndexIter::new(&template.shape) {
            for (axis, (dim, column)) in template.dims.iter().zip(dim_columns.iter_mut()).enumerate()
            {
                let i = index[axis];
                match (column, dataset.coord_for_dim(dim)) {
                    (Column::Text(col), Some((_, coord))) => col.push(
                        coord
                            .labels
                            .as_ref()
                            .map(|l| l[i].clone())
                            .unwrap_or_default(),
                    ),
                    (Column::Float(col), Some((_, coord))) => col.push(coord.values[i]),
                    (Column::Float(col), None) => col.push(i as f64),
                    (Column::Text(col), None) => col.push(i.to_string()),
                }
            }
        }

        let mut columns = dim_columns;
        for name in names {
            let Some(var) = dataset.variable(name) else {
                warn!(variable = %name, "not in dataset, skipped");
                continue;
            };
            if var.dims != template.dims || var.shape != template.shape {
                warn!(variable = %name, dims = ?var.dims, "dimensions differ from first variable, skipped");
                continue;
            }
            headers.push(name.clone());
            columns.push(Column::Float(var.data.clone()));
        }

        Ok(FlatTable { headers, columns })
    }

    /// All data variables that share the first data variable's dimensions.
    pub fn from_dataset(dataset: &GridDataset) -> Result<Self> {
        let Some(template) = dataset.variables.values().next() else {
            return Ok(FlatTable {
                headers: Vec::new(),
                columns: Vec::new(),
            });
        };
        let names: Vec<String> = dataset
            .variables
            .iter()
            .filter(|(_, v)| v.dims == template.dims)
            .map(|(n, _)| n.clone())
            .collect();
        FlatTable::from_variables(dataset, &names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Coordinate, Variable};

    fn dataset() -> GridDataset {
        let mut time = Coordinate::new("time", vec![0.0]);
        time.labels = Some(vec!["2025-01-01T00:00:00".into()]);
        GridDataset::new()
            .with_coord("time", time)
            .with_coord("lat", Coordinate::new("lat", vec![47.5, 47.6]))
            .with_variable(
                "aod",
                Variable::new(
                    "aod",
                    vec!["time".into(), "lat".into(), "band".into()],
                    vec![1, 2, 2],
                    vec![0.1, f64::NAN, 0.3, 0.4],
                )
                .unwrap(),
            )
            .with_variable(
                "qa",
                Variable::new(
                    "qa",
                    vec!["time".into(), "lat".into(), "band".into()],
                    vec![1, 2, 2],
                    vec![3.0, 0.0, 3.0, 3.0],
                )
                .unwrap(),
            )
            .with_variable(
                "palette",
                Variable::new("palette", vec!["rgb".into()], vec![1], vec![255.0]).unwrap(),
            )
    }

    #[test]
    fn test_flatten_dataset() {
        let table = FlatTable::from_dataset(&dataset()).unwrap();
        assert_eq!(table.headers, vec!["time", "lat", "band", "aod", "qa"]);
        assert_eq!(table.num_rows(), 4);
        assert_eq!(table.columns[0].cell(3), "2025-01-01T00:00:00");
        assert_eq!(table.columns[1].cell(2), "47.6");
        assert_eq!(table.columns[2].cell(1), "1");
        assert_eq!(table.columns[3].cell(1), "");
    }

    #[test]
    fn test_mismatched_variable_skipped() {
        let table = FlatTable::from_variables(&dataset(), &["aod".into(), "palette".into()])
            .unwrap();
        assert_eq!(table.headers.last().unwrap(), "aod");
    }

    #[test]
    fn test_unknown_first_variable() {
        assert!(FlatTable::from_variables(&dataset(), &["nope".into()]).is_err());
    }
}
