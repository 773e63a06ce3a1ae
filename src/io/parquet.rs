//! Parquet output (Snappy compressed) via Arrow record batches.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::Result;
use crate::io::table::{Column, FlatTable};

fn to_record_batch(table: &FlatTable) -> Result<RecordBatch> {
    let fields: Vec<Field> = table
        .headers
        .iter()
        .zip(&table.columns)
        .map(|(name, col)| {
            let dtype = match col {
                Column::Float(_) => DataType::Float64,
                Column::Text(_) => DataType::Utf8,
            };
            Field::new(name, dtype, true)
        })
        .collect();

    let arrays: Vec<ArrayRef> = table
        .columns
        .iter()
        .map(|col| match col {
            Column::Float(v) => Arc::new(Float64Array::from(v.clone())) as ArrayRef,
            Column::Text(v) => Arc::new(StringArray::from(v.clone())) as ArrayRef,
        })
        .collect();

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Writes the table to a Parquet file. Returns the number of rows.
pub fn write_table(path: &Path, table: &FlatTable) -> Result<usize> {
    let batch = to_record_batch(table)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(batch.num_rows())
}
