use crate::grid::{nan_mean, nan_min_max, GridDataset};
use std::fmt;

const MAX_VALUE_LEN: usize = 80;

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

struct Summary<'a>(&'a GridDataset);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dataset = self.0;
        let dim_list: Vec<String> = dataset
            .dims()
            .iter()
            .map(|(d, n)| format!("{}: {}", d, n))
            .collect();
        writeln!(f, "<GridDataset>")?;
        writeln!(f, "Dimensions:  ({})", dim_list.join(", "))?;

        writeln!(f, "Coordinates:")?;
        for (name, coord) in &dataset.coords {
            let range = match nan_min_max(&coord.values) {
                Some((lo, hi)) => format!("{} .. {}", lo, hi),
                None => "empty".to_string(),
            };
            writeln!(f, "  * {:<24} ({}) float64 {}", name, coord.dim, range)?;
        }

        writeln!(f, "Data variables:")?;
        for (name, var) in &dataset.variables {
            let mean = match nan_mean(&var.data) {
                Some(m) => format!(", mean {:.4}", m),
                None => String::new(),
            };
            writeln!(
                f,
                "    {:<24} ({}) float64 {} values, {} valid{}",
                name,
                var.dims.join(", "),
                var.size(),
                var.count_valid(),
                mean
            )?;
        }

        writeln!(f, "Attributes:")?;
        for (key, value) in &dataset.attrs {
            writeln!(
                f,
                "    {}: {}",
                key,
                truncate(&value.to_string(), MAX_VALUE_LEN)
            )?;
        }
        Ok(())
    }
}

/// Plain-text overview of dimensions, coordinates, variables and attributes.
pub fn render(dataset: &GridDataset) -> String {
    Summary(dataset).to_string()
}
