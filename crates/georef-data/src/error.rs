use polars::prelude::PolarsError;
use thiserror::Error;
pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[cfg(feature = "download_data")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[cfg(feature = "download_data")]
    #[error("Join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
    #[cfg(feature = "download_data")]
    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),
    #[error("Data file not found: {0}")]
    DataFileNotFound(std::path::PathBuf),
    #[error("Required data files not found in the provided directory")]
    RequiredFilesNotFound,
    #[error("Invalid data source descriptor: {0}")]
    InvalidDescriptor(String),
}
