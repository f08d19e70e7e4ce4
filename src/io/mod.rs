//! IO utilities for loading feature tables.

pub mod csv_dataset;

pub use csv_dataset::{read_csv_dataset, CsvData, CsvReaderConfig};
