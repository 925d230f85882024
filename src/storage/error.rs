use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create dataset directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to create dataset file '{0}'")]
    FileCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read metadata for dataset file '{0}'")]
    MetadataRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to open dataset file '{0}' for writing")]
    OpenForWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to replace dataset file '{0}'")]
    Replace(PathBuf, #[source] std::io::Error),

    #[error("Failed to read CSV dataset '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Failed to write CSV dataset '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),

    #[error("Required column '{column}' not found in {location}")]
    MissingColumn { location: String, column: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
