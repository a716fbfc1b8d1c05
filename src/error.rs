use std::path::PathBuf;
use thiserror::Error;

/// Problems resolving where the catalog and the output tree live.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Source folder not found: {0}")]
    SourceMissing(PathBuf),

    #[error("No product folders found in {0}")]
    NoProducts(PathBuf),

    #[error("Invalid config file {path}: {message}")]
    Load { path: PathBuf, message: String },
}

#[derive(Error, Debug, PartialEq)]
pub enum SaveError {
    #[error("Cannot save: {} source file(s) missing: {}", .0.len(), .0.join(", "))]
    MissingSource(Vec<String>),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Save unavailable: {0}")]
    NotReady(&'static str),

    #[error("Error saving selection: {0}")]
    IoFailure(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum DeleteError {
    #[error("No saved selection for {0}")]
    NotFound(String),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Failed to delete: {0}")]
    IoFailure(String),
}

/// Reading back a stored selection record.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("No saved selection for {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to read selection metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to build archive: {0}")]
    IoFailure(String),
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        ArchiveError::IoFailure(err.to_string())
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        ArchiveError::IoFailure(err.to_string())
    }
}

impl From<walkdir::Error> for ArchiveError {
    fn from(err: walkdir::Error) -> Self {
        ArchiveError::IoFailure(err.to_string())
    }
}
