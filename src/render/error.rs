use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to write output file '{0}'")]
    OutputWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode '{0}'")]
    Encode(PathBuf, #[source] PolarsError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Nothing to render: the grid for '{0}' is empty")]
    EmptyGrid(String),
}
