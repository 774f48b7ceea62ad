use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileStampError {
    /// Open or read failed after the path was classified as a file
    #[error("IO failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid checksum: {0}")]
    InvalidChecksum(String),

    #[error("Unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Scan was cancelled")]
    Cancelled,
}

impl FileStampError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FileStampError>;
