use crate::error::Result;
use crate::io::table::FlatTable;
use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::path::Path;

// Create CSV writer and write the header row
pub fn create_csv_writer(path: &Path, headers: &[String]) -> Result<Writer<File>> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    wtr.write_record(headers)?;
    Ok(wtr)
}

/// Writes the table with NaN cells left empty. Returns the number of rows.
pub fn write_table(path: &Path, table: &FlatTable) -> Result<usize> {
    let mut wtr = create_csv_writer(path, &table.headers)?;
    let rows = table.num_rows();
    for row in 0..rows {
        wtr.write_record(table.columns.iter().map(|c| c.cell(row)))?;
    }
    wtr.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::table::Column;

    #[test]
    fn test_write_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = FlatTable {
            headers: vec!["lat".into(), "aod".into()],
            columns: vec![
                Column::Float(vec![47.5, 47.6]),
                Column::Float(vec![0.15, f64::NAN]),
            ],
        };
        assert_eq!(write_table(&path, &table).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "lat,aod\n47.5,0.15\n47.6,\n");
    }
}
