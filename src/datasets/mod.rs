/// The SMS spam dataset
pub mod spam;

/// Label-stratified train/validation/test partitioning
pub mod split;

use std::path::PathBuf;

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// The file could not be opened or its header could not be read
    #[error("unable to read dataset {path}: {source}")]
    Open {
        /// Path of the delimited file
        path: PathBuf,
        /// Underlying reader error
        source: csv::Error,
    },

    /// A required column is absent from the header row
    #[error("dataset {path} has no '{column}' column")]
    MissingColumn {
        /// Path of the delimited file
        path: PathBuf,
        /// The missing column name
        column: &'static str,
    },

    /// A data row could not be parsed
    #[error("malformed row {row}: {source}")]
    Row {
        /// 1-based index of the data row (the header is not counted)
        row: usize,
        /// Underlying reader error
        source: csv::Error,
    },

    /// A label outside of the binary label set
    #[error("row {row} has label {label}, expected 0 (ham) or 1 (spam)")]
    InvalidLabel {
        /// 1-based index of the data row
        row: usize,
        /// The offending label
        label: i64,
    },

    /// The file holds a header but no records
    #[error("dataset {0} contains no records")]
    Empty(PathBuf),
}
