pub mod csv;
pub mod netcdf;
pub mod parquet;
pub mod summary;
pub mod table;
