use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirsumError {
    #[error("No path provided")]
    EmptyPath,

    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Listing a directory failed mid-traversal. Absorbed by the scanner and
    /// folded into a zero aggregate; never returned from [`crate::aggregate`].
    #[error("Cannot read directory {path}: {source}")]
    SubtreeUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DirsumError {
    /// True for the errors that reject the traversal root itself.
    pub fn is_invalid_path(&self) -> bool {
        matches!(
            self,
            DirsumError::EmptyPath | DirsumError::PathNotFound(_) | DirsumError::NotADirectory(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DirsumError>;
