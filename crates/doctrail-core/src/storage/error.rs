//! Local cache errors

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading or replacing a cache blob
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot create cache directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing, syncing or removing a blob failed
    #[error("Cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The temp file was written but could not replace the blob
    #[error("Cannot move '{from}' into place at '{to}': {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed cache data in '{path}': {details}")]
    Malformed { path: PathBuf, details: String },

    #[error("Cannot serialize '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| StorageError::Write { path, source }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
